/// Labels for the command line front end.
/// Locale is picked with `--locale` or `METEO_LOCALE` (e.g. `--locale fr`).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Fr,
}

impl Locale {
    pub fn from_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "fr" | "fr-fr" | "fr_fr" | "fr-be" | "fr-ca" | "fr-ch" => Self::Fr,
            _ => Self::En,
        }
    }
}

pub struct Messages {
    pub region: &'static str,
    pub coordinates: &'static str,
    pub temperature: &'static str,
    pub windspeed: &'static str,
    pub winddirection: &'static str,
    pub weathercode: &'static str,
    pub observed_at: &'static str,
    pub items_header: &'static str,
    pub items_empty: &'static str,
    pub no_data: &'static str,
    pub download_saved: &'static str,
    pub value_unknown: &'static str,
    pub error_prefix: &'static str,
}

pub static EN: Messages = Messages {
    region: "Region",
    coordinates: "Coordinates",
    temperature: "Temperature",
    windspeed: "Wind speed",
    winddirection: "Wind direction",
    weathercode: "Weather code",
    observed_at: "Observed at",
    items_header: "Items",
    items_empty: "No items",
    no_data: "No data",
    download_saved: "Saved",
    value_unknown: "?",
    error_prefix: "ERR",
};

pub static FR: Messages = Messages {
    region: "Département",
    coordinates: "Coordonnées",
    temperature: "Température",
    windspeed: "Vitesse du vent",
    winddirection: "Direction du vent",
    weathercode: "Code météo",
    observed_at: "Relevé à",
    items_header: "Articles",
    items_empty: "Aucun article",
    no_data: "Aucune donnée",
    download_saved: "Enregistré",
    value_unknown: "?",
    error_prefix: "ERREUR",
};

pub fn get_messages(locale: Locale) -> &'static Messages {
    match locale {
        Locale::En => &EN,
        Locale::Fr => &FR,
    }
}
