// Vendor REST endpoint catalog
// Flat list of URL templates, one helper per route

/// Default production API base
pub const DEFAULT_API_BASE: &str = "https://api.easee.com/api";

pub fn chargers(base: &str) -> String {
    format!("{}/chargers", base)
}

pub fn charger_state(base: &str, charger_id: &str) -> String {
    format!("{}/chargers/{}/state", base, charger_id)
}

pub fn charger_config(base: &str, charger_id: &str) -> String {
    format!("{}/chargers/{}/config", base, charger_id)
}

pub fn charger_details(base: &str, charger_id: &str) -> String {
    format!("{}/chargers/{}/details", base, charger_id)
}

pub fn charger_command(base: &str, charger_id: &str, command: &str) -> String {
    format!("{}/chargers/{}/commands/{}", base, charger_id, command)
}

pub fn charger_settings(base: &str, charger_id: &str) -> String {
    format!("{}/chargers/{}/settings", base, charger_id)
}

pub fn circuit_settings(base: &str, site_id: u64, circuit_id: u64) -> String {
    format!("{}/sites/{}/circuits/{}/settings", base, site_id, circuit_id)
}

pub fn equalizers(base: &str) -> String {
    format!("{}/equalizers", base)
}

pub fn equalizer_state(base: &str, equalizer_id: &str) -> String {
    format!("{}/equalizers/{}/state", base, equalizer_id)
}

pub fn equalizer_config(base: &str, equalizer_id: &str) -> String {
    format!("{}/equalizers/{}/config", base, equalizer_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_templates() {
        let base = "https://api.easee.com/api";
        assert_eq!(
            charger_state(base, "EH123456"),
            "https://api.easee.com/api/chargers/EH123456/state"
        );
        assert_eq!(
            charger_command(base, "EH123456", "start_charging"),
            "https://api.easee.com/api/chargers/EH123456/commands/start_charging"
        );
        assert_eq!(
            circuit_settings(base, 42, 7),
            "https://api.easee.com/api/sites/42/circuits/7/settings"
        );
    }
}
