mod common;
mod documents;
