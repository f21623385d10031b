/// meteoblue hourly pictocode
#[derive(Debug, PartialEq, Eq)]
pub struct Pictocode {
    pub code: u8,
    pub description: &'static str,
    pub emoji: &'static str,
}

const fn p(code: u8, description: &'static str, emoji: &'static str) -> Pictocode {
    Pictocode {
        code,
        description,
        emoji,
    }
}

static HOURLY: [Pictocode; 35] = [
    p(1, "Clear, cloudless sky", "☀️"),
    p(2, "Clear, few cirrus", "☀️"),
    p(3, "Clear with cirrus", "☀️"),
    p(4, "Clear with few low clouds", "🌤️"),
    p(5, "Clear with few low clouds and few cirrus", "🌤️"),
    p(6, "Clear with few low clouds and cirrus", "🌤️"),
    p(7, "Partly cloudy", "⛅"),
    p(8, "Partly cloudy and few cirrus", "⛅"),
    p(9, "Partly cloudy and cirrus", "⛅"),
    p(10, "Mixed with some thunderstorm clouds possible", "🌦️"),
    p(11, "Mixed with few cirrus with some thunderstorm clouds possible", "🌦️"),
    p(12, "Mixed with cirrus with some thunderstorm clouds possible", "🌦️"),
    p(13, "Clear but hazy", "🌫️"),
    p(14, "Clear but hazy with few cirrus", "🌫️"),
    p(15, "Clear but hazy with cirrus", "🌫️"),
    p(16, "Fog/low stratus clouds", "🌫️"),
    p(17, "Fog/low stratus clouds with few cirrus", "🌫️"),
    p(18, "Fog/low stratus clouds with cirrus", "🌫️"),
    p(19, "Mostly cloudy", "☁️"),
    p(20, "Mostly cloudy and few cirrus", "☁️"),
    p(21, "Mostly cloudy and cirrus", "☁️"),
    p(22, "Overcast", "☁️"),
    p(23, "Overcast with rain", "🌧️"),
    p(24, "Overcast with snow", "🌨️"),
    p(25, "Overcast with heavy rain", "🌧️🌧️"),
    p(26, "Overcast with heavy snow", "❄️"),
    p(27, "Rain, thunderstorms likely", "⛈️"),
    p(28, "Light rain, thunderstorms likely", "🌦️⛈️"),
    p(29, "Storm with heavy snow", "🌨️🌪️"),
    p(30, "Heavy rain, thunderstorms likely", "⛈️🌧️"),
    p(31, "Mixed with showers", "🌦️"),
    p(32, "Mixed with snow showers", "🌨️"),
    p(33, "Overcast with light rain", "🌦️"),
    p(34, "Overcast with light snow", "🌨️"),
    p(35, "Overcast with mixture of snow and rain", "🌧️❄️"),
];

pub fn lookup(code: u8) -> Option<&'static Pictocode> {
    HOURLY.get(usize::from(code).checked_sub(1)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_code() {
        for (i, entry) in HOURLY.iter().enumerate() {
            assert_eq!(usize::from(entry.code), i + 1);
        }
        assert_eq!(lookup(22).unwrap().description, "Overcast");
    }

    #[test]
    fn unknown_codes_have_no_entry() {
        assert_eq!(lookup(0), None);
        assert_eq!(lookup(36), None);
    }
}
