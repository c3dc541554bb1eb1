mod command_input;
mod input;
mod key_result;
mod movie_grid;
mod search_input;

pub use command_input::{CommandEvent, CommandInput};
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use movie_grid::{GridEvent, MovieGrid};
pub use search_input::{SearchEvent, SearchInput};
