use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs");

    let Ok(output) = Command::new("git")
        .args(["rev-parse", "--short=12", "HEAD"])
        .output()
    else {
        return;
    };
    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if output.status.success() && !sha.is_empty() {
        println!("cargo:rustc-env=SPACEMIRROR_BUILD_GIT_SHA={sha}");
    }
}
