pub mod bank;
pub mod etl;
pub mod export;
pub mod links;
pub mod lint;
pub mod mdx;
pub mod naming;
pub mod tokens;

pub use crate::domain::model::{MdxDocument, Question, QuestionBank, TransformResult};
pub use crate::domain::ports::{Pipeline, QuestionGenerator, QuestionStore, Storage};
pub use crate::utils::error::Result;
