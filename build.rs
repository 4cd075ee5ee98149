fn main() {
    // Propagate the ESP-IDF toolchain environment to dependent builds.
    // Host-side test builds (no `espidf` feature) have nothing to emit.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
