fn main() {
    // ESP-IDF link/sysenv plumbing is only meaningful for device builds.
    if std::env::var("CARGO_FEATURE_ESPIDF").is_ok() {
        embuild::espidf::sysenv::output();
    }
}
