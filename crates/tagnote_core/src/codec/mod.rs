//! Category <-> numeric code mapping used by the persistence tier.
//!
//! # Responsibility
//! - Translate categories to the integer `tag_style` column and back.
//! - Recover from codes the local table does not know.
//!
//! # Invariants
//! - The table is a bijection over the three categories.
//! - Decoding never fails through `from_code`; unknown codes map to the
//!   configured fallback and are logged.

use crate::model::category::Category;
use log::warn;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Raw numeric mapping, injectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecTable {
    pub problem: i64,
    pub idea: i64,
    pub solution: i64,
    /// Category used for codes outside the table.
    pub fallback: Category,
}

impl Default for CodecTable {
    fn default() -> Self {
        Self {
            problem: 0,
            idea: 1,
            solution: 2,
            fallback: Category::Problem,
        }
    }
}

impl CodecTable {
    fn code_of(&self, category: Category) -> i64 {
        match category {
            Category::Problem => self.problem,
            Category::Idea => self.idea,
            Category::Solution => self.solution,
        }
    }
}

/// Table construction error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Two categories share one code.
    DuplicateCode {
        code: i64,
        first: Category,
        second: Category,
    },
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateCode {
                code,
                first,
                second,
            } => write!(
                f,
                "category code {code} is assigned to both `{first}` and `{second}`"
            ),
        }
    }
}

impl Error for CodecError {}

/// Code that is not part of the active table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownCategoryCode {
    pub code: i64,
    pub fallback: Category,
}

impl Display for UnknownCategoryCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown category code {}; defaulting to `{}`",
            self.code, self.fallback
        )
    }
}

impl Error for UnknownCategoryCode {}

/// Validated category codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryCodec {
    table: CodecTable,
}

impl CategoryCodec {
    /// Builds a codec from a raw table.
    ///
    /// # Errors
    /// - Returns `CodecError::DuplicateCode` when the table is not a bijection.
    pub fn new(table: CodecTable) -> Result<Self, CodecError> {
        for (idx, first) in Category::ALL.iter().enumerate() {
            for second in &Category::ALL[idx + 1..] {
                let code = table.code_of(*first);
                if code == table.code_of(*second) {
                    return Err(CodecError::DuplicateCode {
                        code,
                        first: *first,
                        second: *second,
                    });
                }
            }
        }
        Ok(Self { table })
    }

    pub fn table(&self) -> CodecTable {
        self.table
    }

    pub fn fallback(&self) -> Category {
        self.table.fallback
    }

    pub fn to_code(&self, category: Category) -> i64 {
        self.table.code_of(category)
    }

    /// Strict decode.
    ///
    /// # Errors
    /// - Returns `UnknownCategoryCode` for codes outside the table.
    pub fn try_from_code(&self, code: i64) -> Result<Category, UnknownCategoryCode> {
        Category::ALL
            .into_iter()
            .find(|category| self.table.code_of(*category) == code)
            .ok_or(UnknownCategoryCode {
                code,
                fallback: self.table.fallback,
            })
    }

    /// Lenient decode used on every read path.
    pub fn from_code(&self, code: i64) -> Category {
        match self.try_from_code(code) {
            Ok(category) => category,
            Err(unknown) => {
                warn!(
                    "event=category_decode module=codec status=recovered code={} fallback={}",
                    unknown.code, unknown.fallback
                );
                unknown.fallback
            }
        }
    }
}
