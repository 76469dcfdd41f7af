use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::context::{Canceller, Scope};
use crate::inspector::{Editability, Inspection, InspectorHandle};
use crate::path::InspectionPath;

pub type Color = [f32; 4];

pub const DIFF_BACKGROUND_A: Color = [0.7, 0.12, 0.0, 0.3];
pub const DIFF_BACKGROUND_B: Color = [0.13, 0.62, 0.0, 0.3];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(&self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Side::A => "A",
            Side::B => "B",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_tip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Color>,
}

impl CellData {
    fn from_inspection(inspection: Option<&Inspection>) -> Self {
        let Some(inspection) = inspection else {
            return Self::default();
        };
        let mut lines = Vec::new();
        if let Some(source) = &inspection.source {
            lines.push(format!("Source : {source}"));
        }
        match &inspection.editability {
            Editability::Editable { target } => lines.push(format!("Edit in : {target}")),
            Editability::NotEditable { reason } => lines.push(format!("Not editable : {reason}")),
        }
        Self {
            value: Some(inspection.value.clone()),
            tool_tip: (!lines.is_empty()).then(|| lines.join("\n")),
            background: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct InspectorColumn {
    side: Side,
    header: String,
}

impl InspectorColumn {
    pub fn new(side: Side) -> Self {
        Self::with_header(side, "Value")
    }

    pub fn with_header(side: Side, header: impl Into<String>) -> Self {
        Self {
            side,
            header: header.into(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn inspect(&self, path: &InspectionPath, canceller: &Canceller) -> Result<Option<Inspection>> {
        let Some(inspector) = path.resolve(canceller)? else {
            return Ok(None);
        };
        self.inspect_with(&inspector, path, canceller)
    }

    pub fn inspect_with(
        &self,
        inspector: &InspectorHandle,
        path: &InspectionPath,
        canceller: &Canceller,
    ) -> Result<Option<Inspection>> {
        let scope = Scope::new(path.context(self.side), canceller);
        inspector.inspect(&scope)
    }

    pub fn cell_data(&self, path: &InspectionPath, canceller: &Canceller) -> Result<CellData> {
        Ok(CellData::from_inspection(self.inspect(path, canceller)?.as_ref()))
    }
}

/// A value present on only one side differs; two absences do not. Otherwise
/// the values are compared structurally.
pub fn values_differ(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a != b,
        (None, None) => false,
        _ => true,
    }
}

#[derive(Clone, Debug)]
pub struct Comparison {
    pub this: Option<Inspection>,
    pub other: Option<Inspection>,
    pub different: bool,
}

/// One side of an A/B comparison, tinted when the other side disagrees.
#[derive(Clone, Debug)]
pub struct DiffColumn {
    column: InspectorColumn,
    other: InspectorColumn,
    background: Color,
}

impl DiffColumn {
    pub fn new(side: Side) -> Self {
        Self {
            column: InspectorColumn::with_header(side, side.label()),
            other: InspectorColumn::with_header(side.other(), side.label()),
            background: match side {
                Side::A => DIFF_BACKGROUND_A,
                Side::B => DIFF_BACKGROUND_B,
            },
        }
    }

    pub fn side(&self) -> Side {
        self.column.side()
    }

    pub fn header(&self) -> &str {
        self.column.header()
    }

    /// This side's inspection and whether the other side differs from it.
    pub fn compare(
        &self,
        path: &InspectionPath,
        canceller: &Canceller,
    ) -> Result<(Option<Inspection>, bool)> {
        let Some(inspector) = path.resolve(canceller)? else {
            return Ok((None, false));
        };
        let comparison = self.compare_with(&inspector, path, canceller)?;
        Ok((comparison.this, comparison.different))
    }

    pub fn compare_with(
        &self,
        inspector: &InspectorHandle,
        path: &InspectionPath,
        canceller: &Canceller,
    ) -> Result<Comparison> {
        let this = self.column.inspect_with(inspector, path, canceller)?;
        let other = self.other.inspect_with(inspector, path, canceller)?;
        let different = values_differ(
            this.as_ref().map(|inspection| &inspection.value),
            other.as_ref().map(|inspection| &inspection.value),
        );
        Ok(Comparison {
            this,
            other,
            different,
        })
    }

    pub fn cell_data(&self, path: &InspectionPath, canceller: &Canceller) -> Result<CellData> {
        let (inspection, different) = self.compare(path, canceller)?;
        let mut result = CellData::from_inspection(inspection.as_ref());
        result.background = different.then_some(self.background);
        Ok(result)
    }
}
