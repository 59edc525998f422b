//! # Form Builders
//!
//! One [`FormBuilder`] per supported form. The forms differ in which
//! schedules they carry and how they describe themselves; the assembly
//! itself is shared.
//!
//! Building fails closed, in this order:
//!
//! 1. unsupported form (ITR-5..7),
//! 2. mandatory fields without a resolution (all of them listed),
//! 3. resolved fields the form has no schedule for,
//! 4. a computation that no longer matches the resolved values,
//! 5. JSON Schema violations in the assembled document.

use itr_core::{FieldKind, ItrType};
use itr_forms::{missing_mandatory, permits, schedules_for, ScheduleKind};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::context::{BuildContext, SchemaDocument};
use crate::error::BuildError;
use crate::schedules::{
    filing_status, form_info, part_b_ti, part_b_tti, personal_info, schedule, schedule_key,
};
use crate::validate::SchemaRegistry;

/// Assembles the document for one form.
pub trait FormBuilder: Send + Sync {
    /// The form this builder produces.
    fn itr_type(&self) -> ItrType;

    /// One-line description printed in the form block.
    fn description(&self) -> &'static str;

    /// Schedules this form carries.
    fn schedules(&self) -> &'static [ScheduleKind] {
        schedules_for(self.itr_type())
    }

    /// Assemble the unvalidated document.
    fn assemble(&self, ctx: &BuildContext<'_>) -> Value {
        let itr = self.itr_type();
        let key = itr.schema_key();
        let mut form = Map::new();

        let (info_key, info) = form_info(key, itr, self.description(), ctx);
        form.insert(info_key, info);
        form.insert("PersonalInfo".into(), personal_info(ctx));
        form.insert("FilingStatus".into(), filing_status(ctx));
        for kind in self.schedules() {
            form.insert(schedule_key(*kind).into(), schedule(ctx, *kind));
        }
        form.insert("PartB-TI".into(), part_b_ti(ctx.computation));
        form.insert("PartB-TTI".into(), part_b_tti(ctx.computation));

        let mut itr_obj = Map::new();
        itr_obj.insert(key.into(), Value::Object(form));
        let mut root = Map::new();
        root.insert("ITR".into(), Value::Object(itr_obj));
        Value::Object(root)
    }
}

/// ITR-1 (Sahaj).
#[derive(Debug, Clone, Copy, Default)]
pub struct Itr1;

/// ITR-2.
#[derive(Debug, Clone, Copy, Default)]
pub struct Itr2;

/// ITR-3.
#[derive(Debug, Clone, Copy, Default)]
pub struct Itr3;

/// ITR-4 (Sugam).
#[derive(Debug, Clone, Copy, Default)]
pub struct Itr4;

impl FormBuilder for Itr1 {
    fn itr_type(&self) -> ItrType {
        ItrType::Itr1
    }
    fn description(&self) -> &'static str {
        "Resident individuals with salary, one house property and other sources, total income up to Rs 50 lakh"
    }
}

impl FormBuilder for Itr2 {
    fn itr_type(&self) -> ItrType {
        ItrType::Itr2
    }
    fn description(&self) -> &'static str {
        "Individuals and HUFs without income from business or profession"
    }
}

impl FormBuilder for Itr3 {
    fn itr_type(&self) -> ItrType {
        ItrType::Itr3
    }
    fn description(&self) -> &'static str {
        "Individuals and HUFs with income from business or profession"
    }
}

impl FormBuilder for Itr4 {
    fn itr_type(&self) -> ItrType {
        ItrType::Itr4
    }
    fn description(&self) -> &'static str {
        "Individuals, HUFs and firms with presumptive income under sections 44AD and 44ADA"
    }
}

/// The builder for `itr`, or `UnsupportedForm`.
pub fn builder_for(itr: ItrType) -> Result<&'static dyn FormBuilder, BuildError> {
    match itr {
        ItrType::Itr1 => Ok(&Itr1),
        ItrType::Itr2 => Ok(&Itr2),
        ItrType::Itr3 => Ok(&Itr3),
        ItrType::Itr4 => Ok(&Itr4),
        ItrType::Itr5 | ItrType::Itr6 | ItrType::Itr7 => Err(BuildError::UnsupportedForm { itr }),
    }
}

/// Builds and validates return documents.
#[derive(Debug)]
pub struct ReturnBuilder {
    schemas: SchemaRegistry,
}

impl ReturnBuilder {
    /// Compile the embedded schemas.
    pub fn new() -> Result<Self, BuildError> {
        Ok(Self {
            schemas: SchemaRegistry::embedded()?,
        })
    }

    /// Build, check and digest the document for `ctx.header.itr_type`.
    pub fn build(&self, ctx: &BuildContext<'_>) -> Result<SchemaDocument, BuildError> {
        let itr = ctx.header.itr_type;
        let builder = builder_for(itr)?;

        let fields = missing_mandatory(itr, ctx.resolved.keys());
        if !fields.is_empty() {
            return Err(BuildError::MissingField { itr, fields });
        }

        let not_permitted: Vec<String> = ctx
            .resolved
            .keys()
            .filter(|f| !permits(itr, f.code()))
            .map(ToString::to_string)
            .collect();
        if !not_permitted.is_empty() {
            return Err(BuildError::FieldNotPermitted {
                itr,
                fields: not_permitted,
            });
        }

        check_computation(ctx)?;

        let document = builder.assemble(ctx);
        self.schemas.validate(itr, &document)?;
        let built = SchemaDocument::new(itr, document)?;
        tracing::debug!(%itr, digest = %built.digest, "return document built");
        Ok(built)
    }
}

/// Build with a freshly compiled registry.
pub fn build(ctx: &BuildContext<'_>) -> Result<SchemaDocument, BuildError> {
    ReturnBuilder::new()?.build(ctx)
}

fn check_computation(ctx: &BuildContext<'_>) -> Result<(), BuildError> {
    let c = ctx.computation;
    if c.assessment_year != ctx.header.assessment_year {
        return Err(BuildError::StaleComputation {
            reason: format!(
                "computed for {}, filing is for {}",
                c.assessment_year, ctx.header.assessment_year
            ),
        });
    }
    let income: Decimal = ctx
        .resolved
        .iter()
        .filter(|(f, _)| f.code().kind() == FieldKind::Income)
        .map(|(_, a)| *a)
        .sum();
    if income != c.gross_total_income {
        return Err(BuildError::StaleComputation {
            reason: format!(
                "gross total income {} does not match resolved income {income}",
                c.gross_total_income
            ),
        });
    }
    let paid: Decimal = ctx
        .resolved
        .iter()
        .filter(|(f, _)| f.code().kind() == FieldKind::TaxPaid)
        .map(|(_, a)| *a)
        .sum();
    if paid != c.taxes_paid {
        return Err(BuildError::StaleComputation {
            reason: format!("taxes paid {} does not match resolved {paid}", c.taxes_paid),
        });
    }
    Ok(())
}
