use crate::entries::OpenWindowRecord;
use crate::events::WindowId;
use dashmap::DashMap;

/// Таблица открытых окон верхнего уровня, по одной записи на окно.
///
/// Общая для реконсилеров и сканера приложений: сканер строит действия новых
/// точек входа по текущему числу окон. Очищается при полном перезапуске
/// генераторов.
#[derive(Debug, Default)]
pub struct OpenWindows {
    records: DashMap<WindowId, OpenWindowRecord>,
}

impl OpenWindows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Вставляет или заменяет запись, возвращает предыдущую
    pub fn upsert(&self, record: OpenWindowRecord) -> Option<OpenWindowRecord> {
        self.records.insert(record.window_id.clone(), record)
    }

    pub fn remove(&self, window_id: &WindowId) -> Option<OpenWindowRecord> {
        self.records.remove(window_id).map(|(_, record)| record)
    }

    #[allow(dead_code)]
    pub fn get(&self, window_id: &WindowId) -> Option<OpenWindowRecord> {
        self.records.get(window_id).map(|record| record.value().clone())
    }

    /// Окна приложения в стабильном порядке
    pub fn for_app(&self, app_id: &str) -> Vec<OpenWindowRecord> {
        let mut windows: Vec<OpenWindowRecord> = self
            .records
            .iter()
            .filter(|record| record.app_id == app_id)
            .map(|record| record.value().clone())
            .collect();
        windows.sort_by(|a, b| a.window_id.cmp(&b.window_id));
        windows
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u32, app_id: &str) -> OpenWindowRecord {
        OpenWindowRecord {
            window_id: WindowId::from(id),
            app_id: app_id.to_string(),
            title: format!("window {}", id),
        }
    }

    #[test]
    fn test_upsert_returns_previous() {
        let windows = OpenWindows::new();
        assert!(windows.upsert(record(1, "firefox")).is_none());

        let previous = windows.upsert(record(1, "org.mozilla.firefox"));
        assert_eq!(previous.map(|r| r.app_id), Some("firefox".to_string()));
        assert_eq!(windows.len(), 1);
    }

    #[test]
    fn test_for_app_filters_and_sorts() {
        let windows = OpenWindows::new();
        windows.upsert(record(3, "firefox"));
        windows.upsert(record(1, "firefox"));
        windows.upsert(record(2, "alacritty"));

        let firefox = windows.for_app("firefox");
        let ids: Vec<&str> = firefox.iter().map(|r| r.window_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);

        windows.clear();
        assert!(windows.is_empty());
    }

    #[test]
    fn test_for_app_orders_numeric_ids_as_numbers() {
        let windows = OpenWindows::new();
        for id in [10, 9, 100] {
            windows.upsert(record(id, "firefox"));
        }

        let firefox = windows.for_app("firefox");
        let ids: Vec<&str> = firefox.iter().map(|r| r.window_id.as_str()).collect();
        assert_eq!(ids, vec!["9", "10", "100"]);
    }
}
