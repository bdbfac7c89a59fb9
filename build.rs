fn main() {
    // Only the device build links against ESP-IDF; host builds run the
    // simulated peripherals and need no extra environment.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    // The ONNX model is loaded at runtime; rebuild only when the runtime
    // location hint changes.
    if std::env::var("CARGO_FEATURE_ONNX").is_ok() {
        println!("cargo:rerun-if-env-changed=ORT_LIB_LOCATION");
    }
}
