mod browse;
mod favorites;
mod genres;
mod movie_detail;
mod movie_list;
mod search;

pub use browse::BrowseView;
pub use favorites::FavoritesView;
pub use genres::GenresView;
pub use movie_detail::MovieDetailView;
pub use movie_list::{Listing, MovieListView};
pub use search::SearchView;

use crate::app::AppContext;
use crate::tmdb::types::Movie;
use crate::ui::view::ViewAction;

/// Toggle a favorite and report the outcome in the footer.
pub(crate) fn favorite_toggled(ctx: &AppContext, movie: Movie) -> ViewAction {
  let title = movie.title.clone();
  if ctx.favorites.toggle(movie) {
    ViewAction::Status(format!("♥ Added \"{}\" to favorites", title))
  } else {
    ViewAction::Status(format!("Removed \"{}\" from favorites", title))
  }
}
