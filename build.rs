fn main() {
    // ESP-IDF environment is only needed for the on-target binary; host
    // builds (tests, simulation) skip it.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
