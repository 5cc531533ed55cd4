fn main() {
    for (from, to) in [("TARGET", "GDSLINK_BUILD_TARGET"), ("PROFILE", "GDSLINK_BUILD_PROFILE")] {
        if let Ok(value) = std::env::var(from) {
            println!("cargo:rustc-env={to}={value}");
        }
        println!("cargo:rerun-if-env-changed={from}");
    }
}
