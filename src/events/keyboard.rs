use serde::{Deserialize, Serialize};
use std::fmt;

/// Модификаторы клавиш
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub super_key: bool,
}

impl Modifiers {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn with_ctrl(mut self, ctrl: bool) -> Self {
        self.ctrl = ctrl;
        self
    }

    #[allow(dead_code)]
    pub fn with_alt(mut self, alt: bool) -> Self {
        self.alt = alt;
        self
    }

    #[allow(dead_code)]
    pub fn with_shift(mut self, shift: bool) -> Self {
        self.shift = shift;
        self
    }

    pub fn is_empty(&self) -> bool {
        !self.ctrl && !self.alt && !self.shift && !self.super_key
    }

    pub fn to_vec(&self) -> Vec<String> {
        let mut result = Vec::new();
        if self.ctrl { result.push("ctrl".to_string()); }
        if self.alt { result.push("alt".to_string()); }
        if self.shift { result.push("shift".to_string()); }
        if self.super_key { result.push("super".to_string()); }
        result
    }

    pub fn from_vec(modifiers: &[String]) -> Self {
        let mut result = Self::new();
        for modifier in modifiers {
            match modifier.as_str() {
                "ctrl" => result.ctrl = true,
                "alt" => result.alt = true,
                "shift" => result.shift = true,
                "super" => result.super_key = true,
                _ => {}
            }
        }
        result
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modifiers = self.to_vec();
        if modifiers.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", modifiers.join("+"))
        }
    }
}

/// Сочетание клавиш, по которому ищется действие точки входа
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shortcut {
    pub key: String,
    pub modifiers: Modifiers,
}

impl Shortcut {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into().to_lowercase(),
            modifiers,
        }
    }

    /// Разбор записи вида `ctrl+shift+k`: последний элемент это клавиша
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts: Vec<String> = text.split('+').map(|p| p.trim().to_lowercase()).collect();
        let key = parts.pop().filter(|key| !key.is_empty())?;

        if parts
            .iter()
            .any(|m| !matches!(m.as_str(), "ctrl" | "alt" | "shift" | "super"))
        {
            return None;
        }
        Some(Self::new(key, Modifiers::from_vec(&parts)))
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}+{}", self.modifiers, self.key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_creation() {
        let modifiers = Modifiers::new()
            .with_ctrl(true)
            .with_shift(true);

        assert!(modifiers.ctrl);
        assert!(modifiers.shift);
        assert!(!modifiers.alt);
        assert!(!modifiers.super_key);
        assert!(!modifiers.is_empty());
    }

    #[test]
    fn test_modifiers_from_vec_ignores_unknown() {
        let modifiers = Modifiers::from_vec(&["alt".to_string(), "hyper".to_string()]);
        assert_eq!(modifiers, Modifiers::new().with_alt(true));
    }

    #[test]
    fn test_shortcut_display() {
        let plain = Shortcut::new("F", Modifiers::new());
        let combo = Shortcut::new("w", Modifiers::new().with_ctrl(true).with_shift(true));

        assert_eq!(plain.to_string(), "f");
        assert_eq!(combo.to_string(), "ctrl+shift+w");
    }

    #[test]
    fn test_shortcut_parse() {
        let shortcut = Shortcut::parse("Ctrl+Shift+K").unwrap();
        assert_eq!(shortcut, Shortcut::new("k", Modifiers::new().with_ctrl(true).with_shift(true)));
        assert_eq!(Shortcut::parse("f").unwrap().modifiers, Modifiers::new());
        assert!(Shortcut::parse("hyper+k").is_none());
        assert!(Shortcut::parse("ctrl+").is_none());
    }
}
