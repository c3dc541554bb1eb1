use crate::app::AppContext;
use crate::query::{Query, QueryState};
use crate::tmdb::images::{BackdropSize, PosterSize};
use crate::tmdb::types::{Movie, MovieDetails};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_money, format_runtime, rating_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::favorite_toggled;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

const CAST_SHOWN: usize = 6;

/// Full details for one movie, with related titles to jump to.
pub struct MovieDetailView {
  ctx: AppContext,
  movie_id: i64,
  title: String,
  query: Query<MovieDetails>,
  related_state: ListState,
}

impl MovieDetailView {
  pub fn new(ctx: AppContext, movie_id: i64, title: &str) -> Self {
    let mut query = ctx.queries.details(movie_id, None);
    query.fetch();

    Self {
      ctx,
      movie_id,
      title: title.to_string(),
      query,
      related_state: ListState::default(),
    }
  }

  /// Recommendations, or similar titles when there are none.
  fn related(&self) -> &[Movie] {
    let Some(details) = self.query.data() else {
      return &[];
    };
    [&details.recommendations, &details.similar]
      .into_iter()
      .flatten()
      .map(|page| page.results.as_slice())
      .find(|results| !results.is_empty())
      .unwrap_or(&[])
  }

  fn info_lines(&self, details: &MovieDetails) -> Vec<Line<'static>> {
    let label = |s: &'static str| Span::styled(s, Style::default().fg(Color::DarkGray));
    let mut lines = Vec::new();

    if let Some(tagline) = details.tagline.as_deref().filter(|t| !t.is_empty()) {
      lines.push(Line::styled(tagline.to_string(), Style::default().fg(Color::Gray).italic()));
    }

    let favorite = if self.ctx.favorites.is_favorite(details.id) {
      Span::styled("  ♥ favorite", Style::default().fg(Color::Red))
    } else {
      Span::raw("")
    };
    lines.push(Line::from(vec![
      Span::styled(
        format!("★ {:.1}", details.vote_average),
        Style::default().fg(rating_color(details.vote_average)).bold(),
      ),
      Span::styled(format!(" ({} votes)", details.vote_count), Style::default().fg(Color::DarkGray)),
      Span::raw("   "),
      Span::raw(format_runtime(details.runtime)),
      Span::raw("   "),
      Span::styled(details.status.clone(), Style::default().fg(Color::Cyan)),
      favorite,
    ]));

    let genres: Vec<&str> = details.genres.iter().map(|g| g.name.as_str()).collect();
    lines.push(Line::from(vec![label("Genres:    "), Span::raw(genres.join(", "))]));

    if let Some(credits) = &details.credits {
      let directors: Vec<&str> = credits.directors().map(|d| d.name.as_str()).collect();
      if !directors.is_empty() {
        lines.push(Line::from(vec![label("Director:  "), Span::raw(directors.join(", "))]));
      }
      let cast: Vec<String> = credits
        .cast
        .iter()
        .take(CAST_SHOWN)
        .map(|c| {
          if c.character.is_empty() {
            c.name.clone()
          } else {
            format!("{} ({})", c.name, c.character)
          }
        })
        .collect();
      if !cast.is_empty() {
        lines.push(Line::from(vec![label("Cast:      "), Span::raw(cast.join(", "))]));
      }
    }

    let budget = format_money(details.budget);
    let revenue = format_money(details.revenue);
    if !budget.is_empty() || !revenue.is_empty() {
      lines.push(Line::from(vec![
        label("Budget:    "),
        Span::raw(budget),
        label("   Revenue: "),
        Span::raw(revenue),
      ]));
    }

    if let Some(collection) = &details.belongs_to_collection {
      lines.push(Line::from(vec![label("Part of:   "), Span::raw(collection.name.clone())]));
    }

    if let Some(trailer) = details.videos.as_ref().and_then(|v| v.trailer()) {
      lines.push(Line::from(vec![
        label("Trailer:   "),
        Span::styled(
          format!("https://www.youtube.com/watch?v={}", trailer.key),
          Style::default().fg(Color::Blue),
        ),
      ]));
    }

    if let Some(url) = self.ctx.images.poster(details.poster_path.as_deref(), PosterSize::default()) {
      lines.push(Line::from(vec![label("Poster:    "), Span::raw(url)]));
    }
    if let Some(url) = self.ctx.images.backdrop(details.backdrop_path.as_deref(), BackdropSize::default()) {
      lines.push(Line::from(vec![label("Backdrop:  "), Span::raw(url)]));
    }

    lines.push(Line::raw(""));
    lines.push(Line::raw(details.overview.clone()));
    lines
  }

  fn render_detail(&mut self, frame: &mut Frame, area: Rect) {
    let heading = match self.query.data() {
      Some(details) => match details.release_year() {
        Some(year) => format!("{} ({})", details.title, year),
        None => details.title.clone(),
      },
      None => self.title.clone(),
    };
    let title = match self.query.state() {
      QueryState::Idle | QueryState::Loading => format!(" {} (loading...) ", heading),
      QueryState::Error(e) => format!(" {} (error: {}) ", heading, e),
      QueryState::Success(_) => format!(" {} ", heading),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let Some(error) = self.query.error().filter(|_| self.query.data().is_none()) {
      let paragraph = Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error))
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, inner);
      return;
    }

    let Some(details) = self.query.data() else {
      let paragraph = Paragraph::new("Loading movie details...").style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    };

    let lines = self.info_lines(details);
    let related_len = self.related().len();

    let [info_area, related_area] = if related_len > 0 {
      Layout::vertical([Constraint::Min(8), Constraint::Length(10)]).areas(inner)
    } else {
      Layout::vertical([Constraint::Min(1), Constraint::Length(0)]).areas(inner)
    };

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), info_area);

    if related_len == 0 {
      return;
    }

    ensure_valid_selection(&mut self.related_state, related_len);
    let width = usize::from(related_area.width.saturating_sub(14));
    let items: Vec<ListItem> = self
      .related()
      .iter()
      .map(|movie| {
        let year = movie.release_year().map(|y| y.to_string()).unwrap_or_default();
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<6}", year), Style::default().fg(Color::DarkGray)),
          Span::styled(
            format!("★ {:.1} ", movie.vote_average),
            Style::default().fg(rating_color(movie.vote_average)),
          ),
          Span::raw(truncate(&movie.title, width)),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(
        Block::default()
          .title(" You might also like ")
          .borders(Borders::TOP)
          .border_style(Style::default().fg(Color::DarkGray)),
      )
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, related_area, &mut self.related_state);
  }
}

impl View for MovieDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.related_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.related_state.select_previous(),
      KeyCode::Enter => {
        let picked = self.related_state.selected().and_then(|i| self.related().get(i));
        if let Some(movie) = picked {
          return ViewAction::Push(Box::new(MovieDetailView::new(self.ctx.clone(), movie.id, &movie.title)));
        }
      }
      KeyCode::Char('f') => {
        if let Some(details) = self.query.data() {
          return favorite_toggled(&self.ctx, details.to_summary());
        }
      }
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    match self.query.data() {
      Some(details) => details.title.clone(),
      None if !self.title.is_empty() => self.title.clone(),
      None => format!("#{}", self.movie_id),
    }
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("f", "favorite").with_priority(20),
      ShortcutInfo::new("enter", "open related").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
