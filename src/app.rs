use crate::api::JobsClient;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::ui;
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::JobListView;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;

/// Main application state: a stack of views over one jobs client
pub struct App {
  /// Navigation stack - root is always at index 0
  views: Vec<Box<dyn View>>,

  /// Header title (configured, or the API host)
  title: String,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let client = JobsClient::new(&config)?;
    let title = config
      .title
      .clone()
      .unwrap_or_else(|| config.api_host().to_string());
    let root = JobListView::new(client, &config);

    Ok(Self {
      views: vec![Box::new(root)],
      title,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(100));

    // Main loop
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      if let Some(event) = events.next().await {
        self.handle_event(event);
      }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {
        if let Some(view) = self.views.last_mut() {
          view.tick();
        }
      }
      // The next draw re-derives the window from the new size
      Event::Resize => {}
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let Some(view) = self.views.last_mut() else {
      return;
    };
    match view.handle_key(key) {
      ViewAction::Push(next) => self.views.push(next),
      ViewAction::Pop => {
        if self.views.len() > 1 {
          self.views.pop();
        } else {
          self.should_quit = true;
        }
      }
      ViewAction::None => {}
    }
  }

  // Accessors for UI rendering

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.views.last_mut()
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self.views.iter().map(|v| v.breadcrumb_label()).collect()
  }

  pub fn shortcuts(&self) -> Vec<Shortcut> {
    self
      .views
      .last()
      .map(|v| v.shortcuts())
      .unwrap_or_default()
  }

  pub fn flash(&self) -> Option<&str> {
    self.views.last().and_then(|v| v.flash())
  }
}
