use crate::api::{CachedClient, ResourceKind};
use crate::commands::{self, Action};
use crate::event::{Event, EventHandler};
use crate::list_query::Notice;
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult, Toasts};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::open_list;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  views: Vec<Box<dyn View>>,

  /// `:` palette
  command: CommandInput,

  /// Notifications collected from the views
  toasts: Toasts,

  client: CachedClient,

  /// Header title
  title: String,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(client: CachedClient, title: String, root: ResourceKind) -> Result<Self> {
    let view = open_list(&client, root, "").map_err(|e| eyre!(e))?;
    Ok(Self {
      views: vec![view],
      command: CommandInput::new(),
      toasts: Toasts::new(),
      client,
      title,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));
    info!(title = %self.title, "tui started");

    let result = self.event_loop(&mut terminal, &mut events).await;

    // Cleanup terminal even when drawing failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    // Cached lists do not outlive the session
    self.views.clear();
    self.client.store().clear();
    info!("tui stopped");

    result
  }

  async fn event_loop(
    &mut self,
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Resize | Event::Tick => {}
    }
    // Ticks only fire while idle, so queries are polled after every event
    self.tick();
  }

  /// Poll the views and move their notices into toasts
  fn tick(&mut self) {
    for view in self.views.iter_mut() {
      view.tick();
      for notice in view.take_notices() {
        self.toasts.push(notice);
      }
    }
    self.toasts.prune(Instant::now());
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // A prompt or dialog inside the view gets every key
    if self.captures_input() {
      self.dispatch_to_view(key);
      return;
    }

    match self.command.handle_key(key) {
      KeyResult::Event(CommandEvent::Submitted(line)) => {
        self.execute_command(&line);
        return;
      }
      KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
      KeyResult::NotHandled => {}
    }

    if key.code == KeyCode::Char('x') && !self.toasts.is_empty() {
      self.toasts.dismiss_all();
      return;
    }

    self.dispatch_to_view(key);
  }

  fn dispatch_to_view(&mut self, key: KeyEvent) {
    let Some(view) = self.views.last_mut() else {
      return;
    };
    match view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Push(view) => {
        debug!(view = %view.breadcrumb_label(), "push view");
        self.views.push(view);
      }
      ViewAction::Pop => {
        if self.views.len() > 1 {
          self.views.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn execute_command(&mut self, line: &str) {
    let Some(invocation) = commands::parse(line) else {
      if !line.trim().is_empty() {
        self
          .toasts
          .push(Notice::Error(format!("Unknown command: {}", line.trim())));
      }
      return;
    };

    match invocation.action {
      Action::Open(kind) => match open_list(&self.client, kind, &invocation.argument) {
        Ok(view) => {
          debug!(resource = kind.name(), filter = %invocation.argument, "open root view");
          // Replacing the stack drops the old subscriptions
          self.views.clear();
          self.views.push(view);
        }
        Err(e) => self.toasts.push(Notice::Error(e)),
      },
      Action::Quit => self.should_quit = true,
    }
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn current_view(&self) -> Option<&dyn View> {
    self.views.last().map(|v| v.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.views.last_mut()
  }

  pub fn captures_input(&self) -> bool {
    self.current_view().is_some_and(|v| v.captures_input())
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command
  }

  pub fn toasts(&self) -> &Toasts {
    &self.toasts
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self.views.iter().map(|v| v.breadcrumb_label()).collect()
  }

  /// Footer hint while notifications are shown
  pub fn status(&self) -> Option<String> {
    match self.toasts.len() {
      0 => None,
      1 => Some("1 notification, x to dismiss".to_string()),
      n => Some(format!("{} notifications, x to dismiss", n)),
    }
  }
}
