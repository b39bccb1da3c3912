pub mod conll;

pub use conll::ConllReader;
