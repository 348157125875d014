//! Простая консоль на stdin: список каталога, запуск действий по индексу и
//! по сочетанию клавиш, полный перезапуск генераторов.

use crate::events::Shortcut;
use crate::services::dispatcher::ActionDispatcher;
use crate::services::registry::EntrypointRegistry;
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    List,
    Run { local_id: String, index: usize },
    Shortcut { generator_id: String, shortcut: Shortcut },
    Refresh,
    Help,
}

const HELP: &str = "\
Команды:
  list                         записи каталога
  run <local_id> [index]       выполнить действие (0 основное, 1 дополнительное)
  key <generator> <ctrl+k>     выполнить действие по сочетанию клавиш
  refresh                      перезапустить все генераторы
  help                         эта справка";

/// `None` для пустой строки, `Err` с пояснением для неверной команды
pub fn parse_command(line: &str) -> Option<Result<ConsoleCommand, String>> {
    let mut words = line.split_whitespace();
    let command = words.next()?;

    let parsed = match (command, words.next(), words.next(), words.next()) {
        ("list", None, _, _) => Ok(ConsoleCommand::List),
        ("refresh", None, _, _) => Ok(ConsoleCommand::Refresh),
        ("help", None, _, _) => Ok(ConsoleCommand::Help),
        ("run", Some(local_id), index, None) => match index.map(str::parse::<usize>) {
            None => Ok(ConsoleCommand::Run {
                local_id: local_id.to_string(),
                index: 0,
            }),
            Some(Ok(index)) => Ok(ConsoleCommand::Run {
                local_id: local_id.to_string(),
                index,
            }),
            Some(Err(_)) => Err(format!("некорректный индекс действия: {}", line)),
        },
        ("key", Some(generator_id), Some(combo), None) => match Shortcut::parse(combo) {
            Some(shortcut) => Ok(ConsoleCommand::Shortcut {
                generator_id: generator_id.to_string(),
                shortcut,
            }),
            None => Err(format!("некорректное сочетание: {}", combo)),
        },
        _ => Err(format!("неизвестная команда: {}", line.trim())),
    };
    Some(parsed)
}

/// Блокирующее чтение stdin в отдельном потоке: поток не держит рантайм
/// при завершении процесса
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);

    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("Ошибка чтения stdin: {}", e);
                    return;
                }
            }
        }
        debug!("stdin закрыт");
    });

    rx
}

/// Чтение команд со stdin до EOF. `refresh` передаётся в основной цикл.
pub async fn run_console(
    dispatcher: Arc<ActionDispatcher>,
    registry: Arc<EntrypointRegistry>,
    refresh_tx: mpsc::Sender<()>,
) {
    info!("Консоль запущена, 'help' для списка команд");
    let mut lines = spawn_stdin_reader();

    while let Some(line) = lines.recv().await {

        let command = match parse_command(&line) {
            None => continue,
            Some(Ok(command)) => command,
            Some(Err(message)) => {
                println!("{}", message);
                continue;
            }
        };

        // Ошибки действий уже залогированы диспетчером
        match command {
            ConsoleCommand::List => {
                for entry in registry.get_all().into_values() {
                    let actions: Vec<&str> = entry.actions.iter().map(|a| a.label()).collect();
                    let accessories: Vec<&str> =
                        entry.accessories.iter().map(|a| a.text.as_str()).collect();
                    println!("{}  {:?} {:?}", entry, actions, accessories);
                }
            }
            ConsoleCommand::Run { local_id, index } => {
                let _ = dispatcher.run_action(&local_id, index);
            }
            ConsoleCommand::Shortcut {
                generator_id,
                shortcut,
            } => match dispatcher.run_action_for_shortcut(&generator_id, &shortcut.key, shortcut.modifiers) {
                Ok(false) => println!("Сочетание {} не привязано", shortcut),
                Ok(true) | Err(_) => {}
            },
            ConsoleCommand::Refresh => {
                if refresh_tx.send(()).await.is_err() {
                    return;
                }
            }
            ConsoleCommand::Help => println!("{}", HELP),
        }
    }

    debug!("Консоль завершена");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Modifiers;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("   "), None);
        assert_eq!(parse_command("list"), Some(Ok(ConsoleCommand::List)));
        assert_eq!(
            parse_command("run firefox"),
            Some(Ok(ConsoleCommand::Run { local_id: "firefox".to_string(), index: 0 }))
        );
        assert_eq!(
            parse_command("run firefox 1"),
            Some(Ok(ConsoleCommand::Run { local_id: "firefox".to_string(), index: 1 }))
        );
        assert_eq!(
            parse_command("key bookmarks ctrl+d"),
            Some(Ok(ConsoleCommand::Shortcut {
                generator_id: "bookmarks".to_string(),
                shortcut: Shortcut::new("d", Modifiers::new().with_ctrl(true)),
            }))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_command("run firefox x"), Some(Err(_))));
        assert!(matches!(parse_command("key bookmarks hyper+d"), Some(Err(_))));
        assert!(matches!(parse_command("launch"), Some(Err(_))));
        assert!(matches!(parse_command("list all"), Some(Err(_))));
    }
}
