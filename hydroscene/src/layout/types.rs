//! Layout definitions.
//!
//! A layout is a named arrangement of display slots. Slots are numbered
//! from zero; grid slots are numbered row-major.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// Most slots a layout may have.
pub const MAX_LAYOUT_CELLS: usize = 256;

/// Rows and columns a layout may reach, spans included.
pub const MAX_LAYOUT_EXTENT: u32 = 256;

/// Identity of a layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayoutId(String);

impl LayoutId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position of one slot on the wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellPosition {
    pub row: u32,
    pub col: u32,
    pub row_span: u32,
    pub col_span: u32,
}

impl CellPosition {
    /// A single cell.
    pub fn at(row: u32, col: u32) -> Self {
        Self {
            row,
            col,
            row_span: 1,
            col_span: 1,
        }
    }

    /// A cell spanning several rows and columns.
    pub fn spanning(row: u32, col: u32, row_span: u32, col_span: u32) -> Self {
        Self {
            row,
            col,
            row_span,
            col_span,
        }
    }

    /// One past the last row and column covered, or `None` on overflow.
    fn end(&self) -> Option<(u32, u32)> {
        Some((
            self.row.checked_add(self.row_span)?,
            self.col.checked_add(self.col_span)?,
        ))
    }

    fn overlaps(&self, other: &CellPosition) -> bool {
        let (Some((row_end, col_end)), Some((other_row_end, other_col_end))) = (self.end(), other.end())
        else {
            return true;
        };
        self.row < other_row_end
            && other.row < row_end
            && self.col < other_col_end
            && other.col < col_end
    }
}

/// How slots are arranged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Arrangement {
    /// Regular grid, slots numbered row-major.
    Grid { rows: u32, cols: u32 },
    /// Single row of slots.
    Linear,
    /// Explicit slot positions.
    Custom { positions: Vec<CellPosition> },
}

impl Arrangement {
    pub fn kind(&self) -> &'static str {
        match self {
            Arrangement::Grid { .. } => "grid",
            Arrangement::Linear => "linear",
            Arrangement::Custom { .. } => "custom",
        }
    }
}

/// Layout definition as submitted to the layout manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSpec {
    pub id: LayoutId,
    pub arrangement: Arrangement,
    pub cell_count: usize,
}

impl LayoutSpec {
    /// A `rows` x `cols` grid.
    pub fn grid(id: impl Into<String>, rows: u32, cols: u32) -> Self {
        Self {
            id: LayoutId::new(id),
            arrangement: Arrangement::Grid { rows, cols },
            cell_count: (rows as usize).saturating_mul(cols as usize),
        }
    }

    /// A single row of `cells` slots.
    pub fn linear(id: impl Into<String>, cells: usize) -> Self {
        Self {
            id: LayoutId::new(id),
            arrangement: Arrangement::Linear,
            cell_count: cells,
        }
    }

    /// Explicit positions; one slot per position.
    pub fn custom(id: impl Into<String>, positions: Vec<CellPosition>) -> Self {
        Self {
            id: LayoutId::new(id),
            cell_count: positions.len(),
            arrangement: Arrangement::Custom { positions },
        }
    }

    /// Check the cell count against the arrangement and compute slot positions.
    pub fn validate(&self) -> Result<Vec<CellPosition>, ControlError> {
        let id = self.id.as_str().trim();
        if id.is_empty() || id == "*" {
            return Err(ControlError::validation(format!("invalid layout id '{id}'")));
        }
        if self.cell_count == 0 {
            return Err(ControlError::validation(format!(
                "layout '{id}' must have at least one cell"
            )));
        }
        if self.cell_count > MAX_LAYOUT_CELLS {
            return Err(ControlError::validation(format!(
                "layout '{id}' has {} cells, at most {MAX_LAYOUT_CELLS} are allowed",
                self.cell_count
            )));
        }

        match &self.arrangement {
            Arrangement::Grid { rows, cols } => {
                if *rows == 0 || *cols == 0 {
                    return Err(ControlError::validation(format!(
                        "layout '{id}': grid needs at least one row and column"
                    )));
                }
                if *rows > MAX_LAYOUT_EXTENT || *cols > MAX_LAYOUT_EXTENT {
                    return Err(ControlError::validation(format!(
                        "layout '{id}': {rows}x{cols} grid exceeds {MAX_LAYOUT_EXTENT} rows or columns"
                    )));
                }
                let expected = (*rows as usize) * (*cols as usize);
                if self.cell_count != expected {
                    return Err(ControlError::validation(format!(
                        "layout '{id}': {rows}x{cols} grid has {expected} cells, not {}",
                        self.cell_count
                    )));
                }
                Ok((0..*rows)
                    .flat_map(|r| (0..*cols).map(move |c| CellPosition::at(r, c)))
                    .collect())
            }
            Arrangement::Linear => {
                let cells = u32::try_from(self.cell_count)
                    .ok()
                    .filter(|n| *n <= MAX_LAYOUT_EXTENT)
                    .ok_or_else(|| {
                        ControlError::validation(format!(
                            "layout '{id}': a row holds at most {MAX_LAYOUT_EXTENT} cells"
                        ))
                    })?;
                Ok((0..cells).map(|c| CellPosition::at(0, c)).collect())
            }
            Arrangement::Custom { positions } => {
                if positions.len() != self.cell_count {
                    return Err(ControlError::validation(format!(
                        "layout '{id}': {} positions given for {} cells",
                        positions.len(),
                        self.cell_count
                    )));
                }
                for (slot, position) in positions.iter().enumerate() {
                    if position.row_span == 0 || position.col_span == 0 {
                        return Err(ControlError::validation(format!(
                            "layout '{id}': slot {slot} has a zero span"
                        )));
                    }
                    let within = position
                        .end()
                        .is_some_and(|(r, c)| r <= MAX_LAYOUT_EXTENT && c <= MAX_LAYOUT_EXTENT);
                    if !within {
                        return Err(ControlError::validation(format!(
                            "layout '{id}': slot {slot} reaches past {MAX_LAYOUT_EXTENT} rows or columns"
                        )));
                    }
                    if let Some(other) = positions[..slot].iter().position(|p| p.overlaps(position)) {
                        return Err(ControlError::validation(format!(
                            "layout '{id}': slot {slot} overlaps slot {other}"
                        )));
                    }
                }
                Ok(positions.clone())
            }
        }
    }
}

/// A validated layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub spec: LayoutSpec,
    /// Position of each slot, indexed by slot number.
    pub cells: Vec<CellPosition>,
}

impl Layout {
    pub fn id(&self) -> &LayoutId {
        &self.spec.id
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}
