//! # Shared Schedule Builders
//!
//! Every form is assembled from the same section builders, so Schedule
//! VI-A in ITR-1 and Schedule VI-A in ITR-3 are byte-identical for the same
//! inputs. Each resolved field becomes exactly one line item:
//!
//! ```json
//! {"Code": "GrossSalary", "Ref": "TAN:BLRA12345B", "Amount": 850000}
//! ```
//!
//! Amounts are whole-rupee integers where exact, decimal strings otherwise.

use itr_core::{amount_to_json, DeductionSection, FieldCode, FieldId, Regime};
use itr_forms::ScheduleKind;
use itr_tax::TaxComputation;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use crate::context::BuildContext;

/// Document key for a schedule.
pub fn schedule_key(kind: ScheduleKind) -> &'static str {
    match kind {
        ScheduleKind::Salary => "ScheduleSalary",
        ScheduleKind::HouseProperty => "ScheduleHP",
        ScheduleKind::OtherSources => "ScheduleOS",
        ScheduleKind::CapitalGains => "ScheduleCG",
        ScheduleKind::BusinessProfession => "ScheduleBP",
        ScheduleKind::Presumptive => "ScheduleBPPresumptive",
        ScheduleKind::ForeignAssets => "ScheduleFA",
        ScheduleKind::ExemptIncome => "ScheduleEI",
        ScheduleKind::ChapterVia => "ScheduleVIA",
        ScheduleKind::TaxesPaid => "TaxPaid",
    }
}

/// One line item.
pub fn line_item(field: &FieldId, amount: Decimal) -> Value {
    json!({
        "Code": field.code().schema_label(),
        "Ref": field.instance(),
        "Amount": amount_to_json(amount),
    })
}

/// A schedule: its line items, their total, and any derived figures.
pub fn schedule(ctx: &BuildContext<'_>, kind: ScheduleKind) -> Value {
    let items: Vec<(&FieldId, Decimal)> = ctx
        .resolved
        .iter()
        .filter(|(field, _)| ScheduleKind::for_field(field.code()) == kind)
        .map(|(field, amount)| (field, *amount))
        .collect();

    let mut body = Map::new();
    body.insert(
        "LineItems".into(),
        Value::Array(items.iter().map(|(f, a)| line_item(f, *a)).collect()),
    );

    let total = match kind {
        // The standard deduction is listed under salary but is not salary.
        ScheduleKind::Salary => sum_where(&items, |c| c == FieldCode::SalaryIncome),
        _ => sum_where(&items, |_| true),
    };
    body.insert("Total".into(), amount_to_json(total));

    match kind {
        ScheduleKind::Salary => {
            body.insert(
                "DeductionUs16ia".into(),
                amount_to_json(allowed(ctx.computation, DeductionSection::StandardDeduction)),
            );
        }
        ScheduleKind::ChapterVia => {
            let via: Decimal = ctx
                .computation
                .deductions
                .iter()
                .filter(|d| d.section.is_chapter_via())
                .map(|d| d.allowed)
                .sum();
            body.insert("TotalChapVIADeductions".into(), amount_to_json(via));
        }
        _ => {}
    }
    Value::Object(body)
}

fn sum_where(items: &[(&FieldId, Decimal)], pred: impl Fn(FieldCode) -> bool) -> Decimal {
    items
        .iter()
        .filter(|(f, _)| pred(f.code()))
        .map(|(_, a)| *a)
        .sum()
}

fn allowed(computation: &TaxComputation, section: DeductionSection) -> Decimal {
    computation
        .deductions
        .iter()
        .find(|d| d.section == section)
        .map_or(Decimal::ZERO, |d| d.allowed)
}

/// Form identification block.
pub fn form_info(key: &str, itr: itr_core::ItrType, description: &str, ctx: &BuildContext<'_>) -> (String, Value) {
    (
        format!("Form_{key}"),
        json!({
            "FormName": itr.as_str(),
            "Description": description,
            "AssessmentYear": ctx.header.assessment_year.schema_year(),
            "SchemaVer": "Ver1.0",
        }),
    )
}

/// Taxpayer identification.
pub fn personal_info(ctx: &BuildContext<'_>) -> Value {
    json!({
        "PAN": ctx.header.pan.as_str(),
        "FilingFor": ctx.header.filing_for,
    })
}

/// Section under which the return is filed and the regime opted for.
pub fn filing_status(ctx: &BuildContext<'_>) -> Value {
    let mut status = Map::new();
    match &ctx.header.original_ack {
        // 139(5) revised return.
        Some(ack) => {
            status.insert("ReturnFileSec".into(), json!(17));
            status.insert("OrigRetFiledAckNo".into(), json!(ack.as_str()));
        }
        // 139(1) on or before the due date.
        None => {
            status.insert("ReturnFileSec".into(), json!(11));
        }
    }
    let opt_out = match ctx.computation.regime {
        Regime::Old => "Y",
        Regime::New => "N",
    };
    status.insert("OptOutNewTaxRegime".into(), json!(opt_out));
    Value::Object(status)
}

/// Part B-TI: computation of total income.
pub fn part_b_ti(c: &TaxComputation) -> Value {
    json!({
        "GrossTotalIncome": amount_to_json(c.gross_total_income),
        "DeductionsAllowed": amount_to_json(c.total_deductions),
        "TotalIncome": amount_to_json(c.taxable_income),
    })
}

/// Part B-TTI: computation of tax liability.
pub fn part_b_tti(c: &TaxComputation) -> Value {
    json!({
        "SlabTax": amount_to_json(c.slab_tax),
        "Rebate87A": amount_to_json(c.rebate),
        "RebateMarginalRelief": amount_to_json(c.marginal_relief.rebate),
        "Surcharge": amount_to_json(c.surcharge),
        "SurchargeMarginalRelief": amount_to_json(c.marginal_relief.surcharge),
        "HealthEduCess": amount_to_json(c.cess),
        "TotalTaxLiability": amount_to_json(c.total_tax),
        "RoundedTaxLiability": amount_to_json(c.rounded_total_tax),
        "TaxesPaid": amount_to_json(c.taxes_paid),
        "BalTaxPayable": amount_to_json(c.net_payable),
        "Refund": amount_to_json(c.refundable),
    })
}
