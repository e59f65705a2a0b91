use chrono::Utc;

fn main() {
    // Build time shown by `dropfs --version`
    let build_time = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    println!("cargo:rustc-env=DROPFS_BUILD_TIME={}", build_time);

    println!("cargo:rerun-if-changed=build.rs");
}
