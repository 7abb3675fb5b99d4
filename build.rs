fn main() {
    // Host builds (tests, simulation) skip the ESP-IDF environment export.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
