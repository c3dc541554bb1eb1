use crate::config::{Config, GridConfig};
use crate::event::{Event, EventHandler};
use crate::query::QueryClient;
use crate::store::{FavoritesStore, KeyValueStore, MemoryStore, SearchHistory, SqliteStore};
use crate::tmdb::endpoints::TimeWindow;
use crate::tmdb::images::ImageUrls;
use crate::tmdb::{MovieQueries, TmdbClient, Transport};
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{BrowseView, FavoritesView, GenresView, Listing, MovieListView, SearchView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const TICK_RATE: Duration = Duration::from_millis(100);
const GC_PERIOD: Duration = Duration::from_secs(60);

/// Session-scoped services shared by every view.
#[derive(Clone)]
pub struct AppContext {
  pub queries: MovieQueries,
  pub favorites: FavoritesStore,
  pub history: SearchHistory,
  pub images: ImageUrls,
  pub grid: GridConfig,
}

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  command_input: CommandInput,

  ctx: AppContext,

  region: String,

  /// Last message from a command or view, shown in the footer
  status: Option<String>,

  gc: JoinHandle<()>,

  should_quit: bool,
}

impl App {
  pub async fn new(config: Config) -> Result<Self> {
    let transport: Arc<dyn Transport> = Arc::new(TmdbClient::new(&config)?);
    let queries = MovieQueries::new(QueryClient::new(), transport, config.tmdb.region.clone());

    let store = open_store(&config);
    let ctx = AppContext {
      favorites: FavoritesStore::load(store.clone()),
      history: SearchHistory::load(store),
      images: ImageUrls::new(config.tmdb.image_base_url.clone()),
      grid: config.grid.clone(),
      queries,
    };

    // Warm the first listing; the app is usable without it
    match ctx.queries.prefetch_popular().await {
      Ok(()) => info!("prefetched popular movies"),
      Err(e) => warn!(error = %e, "failed to prefetch popular movies"),
    }

    let gc = ctx.queries.client().spawn_gc(GC_PERIOD);

    Ok(Self {
      view_stack: vec![Box::new(BrowseView::new(ctx.clone()))],
      command_input: CommandInput::new(),
      region: config.tmdb.region,
      ctx,
      status: None,
      gc,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(TICK_RATE);

    let result = self.event_loop(&mut terminal, &mut events).await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

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
        Some(Event::Key(key)) => self.handle_key(key),
        // The grid recomputes its columns from the new layout on the next draw
        Some(Event::Resize(cols, rows)) => tracing::debug!(cols, rows, "terminal resized"),
        Some(Event::Tick) => {
          if let Some(view) = self.view_stack.last_mut() {
            view.tick();
          }
        }
        None => break,
      }
    }
    Ok(())
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let view_owns_keyboard = self.view_stack.last().is_some_and(|v| v.captures_input());
    if !view_owns_keyboard {
      match self.command_input.handle_key(key) {
        KeyResult::Handled => return,
        KeyResult::Event(CommandEvent::Submitted(cmd)) => {
          self.execute_command(&cmd);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) => return,
        KeyResult::NotHandled => {}
      }
    }

    let Some(view) = self.view_stack.last_mut() else {
      return;
    };
    match view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Push(next) => {
        self.status = None;
        self.view_stack.push(next);
      }
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else if key.code == KeyCode::Char('q') {
          self.should_quit = true;
        }
      }
      ViewAction::Status(message) => self.status = Some(message),
    }
  }

  fn execute_command(&mut self, cmd: &str) {
    let ctx = self.ctx.clone();
    let root: Box<dyn View> = match cmd {
      "browse" => Box::new(BrowseView::new(ctx)),
      "popular" => Box::new(MovieListView::new(ctx, Listing::Popular)),
      "now" => Box::new(MovieListView::new(ctx, Listing::NowPlaying)),
      "upcoming" => Box::new(MovieListView::new(ctx, Listing::Upcoming)),
      "top" => Box::new(MovieListView::new(ctx, Listing::TopRated)),
      "trending" => Box::new(MovieListView::new(ctx, Listing::Trending(TimeWindow::Day))),
      "week" => Box::new(MovieListView::new(ctx, Listing::Trending(TimeWindow::Week))),
      "discover" => {
        let listing = Listing::recent_releases(&self.region, chrono::Local::now().date_naive());
        Box::new(MovieListView::new(ctx, listing))
      }
      "genres" => Box::new(GenresView::new(ctx)),
      "search" => Box::new(SearchView::new(ctx)),
      "favorites" => Box::new(FavoritesView::new(ctx)),
      "quit" => {
        self.should_quit = true;
        return;
      }
      "" => return,
      other => {
        self.status = Some(format!("Unknown command: {}", other));
        return;
      }
    };

    self.status = None;
    self.view_stack.clear();
    self.view_stack.push(root);
  }

  // Accessors for UI rendering

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command_input
  }

  pub fn region(&self) -> &str {
    &self.region
  }

  pub fn favorites_count(&self) -> usize {
    self.ctx.favorites.count()
  }

  pub fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    self.view_stack.last().map(|v| v.shortcuts()).unwrap_or_default()
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self.view_stack.iter().map(|v| v.breadcrumb_label()).collect()
  }
}

impl Drop for App {
  fn drop(&mut self) {
    self.gc.abort();
  }
}

/// SQLite at the configured or default path; memory-only if that fails.
fn open_store(config: &Config) -> Arc<dyn KeyValueStore> {
  let path = match config.storage.path.clone().map(Ok).unwrap_or_else(SqliteStore::default_path) {
    Ok(path) => path,
    Err(e) => {
      warn!(error = %e, "no storage location, favorites will not persist");
      return Arc::new(MemoryStore::new());
    }
  };

  match SqliteStore::open(&path) {
    Ok(store) => {
      info!(path = %path.display(), "opened store");
      Arc::new(store)
    }
    Err(e) => {
      warn!(error = %e, "failed to open store, favorites will not persist");
      Arc::new(MemoryStore::new())
    }
  }
}
