fn main() {
    // Build-time credentials are read through `option_env!` in `config.rs`;
    // rebuild when any of them change.
    for var in ["WIFI_SSID", "WIFI_PASS", "MQTT_URL", "MQTT_USER", "MQTT_PASS"] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
