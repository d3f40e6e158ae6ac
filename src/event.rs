use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Terminal resize; the virtualized list re-derives its window
  Resize,
  /// Periodic tick for polling the sync engine
  Tick,
}

/// Event handler that produces events from terminal input and a tick timer
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // Spawn terminal event reader
    tokio::spawn(async move {
      loop {
        let sent = if event::poll(tick_rate).unwrap_or(false) {
          match event::read() {
            // Release/repeat events would double every keystroke
            Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
              tx.send(Event::Key(key))
            }
            Ok(CrosstermEvent::Resize(_, _)) => tx.send(Event::Resize),
            _ => Ok(()),
          }
        } else {
          tx.send(Event::Tick)
        };
        if sent.is_err() {
          break;
        }
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
