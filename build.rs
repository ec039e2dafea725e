use std::env;

fn main() {
    // Linker scripts only apply to the board binary; host builds of the
    // library and its tests link normally.
    if env::var_os("CARGO_FEATURE_FIRMWARE").is_none() {
        return;
    }
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    println!("cargo:rerun-if-changed=build.rs");
}
