/// Ordered `name: value` declarations of a `style` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    pub fn parse(raw: &str) -> Self {
        let declarations = raw
            .split(';')
            .filter_map(|declaration| {
                let (name, value) = declaration.split_once(':')?;
                let name = name.trim().to_ascii_lowercase();
                let value = value.trim();
                if name.is_empty() || value.is_empty() {
                    None
                } else {
                    Some((name, value.to_string()))
                }
            })
            .collect();
        Self { declarations }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.trim_end_matches("!important").trim())
    }

    pub fn set(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.declarations.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.declarations.push((name, value.to_string())),
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.declarations.retain(|(key, _)| key != name);
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Numeric value of a `px` (or unitless) length.
    pub fn px(&self, name: &str) -> Option<f64> {
        self.get(name)
            .map(|value| value.trim_end_matches("px").trim())
            .and_then(|value| value.parse::<f64>().ok())
    }

    pub fn to_css(&self) -> String {
        self.declarations
            .iter()
            .map(|(name, value)| format!("{}: {};", name, value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_rewrites_declarations() {
        let mut style = InlineStyle::parse("display:block; width: 40px;;color : red");
        assert_eq!(style.get("display"), Some("block"));
        assert_eq!(style.px("width"), Some(40.0));
        style.set("display", "none");
        style.remove("color");
        assert_eq!(style.to_css(), "display: none; width: 40px;");
    }

    #[test]
    fn important_suffix_is_ignored_on_read() {
        let style = InlineStyle::parse("visibility: hidden !important");
        assert_eq!(style.get("visibility"), Some("hidden"));
    }
}
