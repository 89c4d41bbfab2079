// 数据模型模块

pub mod filters;
pub mod movie;

pub use filters::{parse_sort, FilterState, SortDirection, SortSpec, DEFAULT_SORT, MIN_SEARCH_LENGTH};
pub use movie::{Genre, GenresResponse, Movie, MovieListType, MoviePage};
