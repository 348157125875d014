//! Разбор `.desktop` файлов (группа `[Desktop Entry]`).

use std::collections::HashMap;

/// Поля `[Desktop Entry]`, которые нужны каталогу
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopEntry {
    pub name: String,
    pub icon: Option<String>,
    pub startup_wm_class: Option<String>,
}

/// `None` для файлов, которые не должны попадать в каталог: не приложения,
/// скрытые, `NoDisplay`, без имени
pub fn parse_desktop_entry(content: &str) -> Option<DesktopEntry> {
    let mut fields: HashMap<&str, &str> = HashMap::new();
    let mut in_main_group = false;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            in_main_group = line == "[Desktop Entry]";
            continue;
        }
        if !in_main_group {
            continue;
        }
        // Локализованные ключи вида Name[ru] не нужны
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            if !key.contains('[') {
                fields.entry(key).or_insert(value.trim());
            }
        }
    }

    if fields.get("Type").copied() != Some("Application") {
        return None;
    }
    if is_true(fields.get("Hidden")) || is_true(fields.get("NoDisplay")) {
        return None;
    }

    let name = fields.get("Name").filter(|name| !name.is_empty())?;
    let non_empty = |key: &str| {
        fields
            .get(key)
            .filter(|value| !value.is_empty())
            .map(|value| value.to_string())
    };

    Some(DesktopEntry {
        name: name.to_string(),
        icon: non_empty("Icon"),
        startup_wm_class: non_empty("StartupWMClass"),
    })
}

fn is_true(value: Option<&&str>) -> bool {
    value.is_some_and(|value| value.eq_ignore_ascii_case("true"))
}
