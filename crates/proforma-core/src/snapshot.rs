//! Acquisition assumptions.
//!
//! An `AssumptionSnapshot` is the single input to every engine component. It is
//! never mutated by the engine; callers build a fresh snapshot on each edit
//! (struct update syntax on a clone) and recompute.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::amortization::{MAX_INTEREST_RATE_PCT, MAX_LOAN_TERM_YEARS};
use crate::error::ProformaError;
use crate::types::{pct_to_rate, Money, Percent, Rate, MAX_AMOUNT};
use crate::ProformaResult;

/// Longest hold period the projection accepts.
pub const MAX_HOLD_YEARS: u32 = 50;

/// Annual growth ceiling. With amounts capped at `MAX_AMOUNT`, the final
/// year's income and its capitalised exit value stay inside Decimal range.
pub const MAX_GROWTH_PCT: Decimal = dec!(50);

/// Smallest positive exit cap rate; anything lower capitalises NOI into
/// figures no sale could produce.
pub const MIN_EXIT_CAP_PCT: Percent = dec!(0.01);

fn check_amount(field: &str, label: &str, value: Decimal) -> ProformaResult<()> {
    if value < Decimal::ZERO {
        return Err(ProformaError::invalid(field, format!("{label} must not be negative")));
    }
    if value > MAX_AMOUNT {
        return Err(ProformaError::invalid(
            field,
            format!("{label} must not exceed {MAX_AMOUNT}"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Income sources
// ---------------------------------------------------------------------------

/// A residential unit on the rent roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub label: String,
    #[serde(default)]
    pub sqft: Decimal,
    pub monthly_rent: Money,
}

/// A commercial lease. Escalation falls back to the snapshot rent growth when
/// the lease does not carry its own bump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lease {
    pub tenant: String,
    #[serde(default)]
    pub sqft: Decimal,
    pub annual_base_rent: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_pct: Option<Percent>,
}

/// Where the property's scheduled rent comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IncomeSource {
    /// Multifamily rent roll, grown at the snapshot rent growth.
    RentRoll { units: Vec<Unit> },
    /// Tenant leases, each escalating at its own contractual rate.
    Leases { leases: Vec<Lease> },
}

impl IncomeSource {
    /// Number of rentable units (apartments or leased suites).
    pub fn unit_count(&self) -> usize {
        match self {
            IncomeSource::RentRoll { units } => units.len(),
            IncomeSource::Leases { leases } => leases.len(),
        }
    }

    pub fn total_sqft(&self) -> Decimal {
        match self {
            IncomeSource::RentRoll { units } => units.iter().map(|u| u.sqft).sum(),
            IncomeSource::Leases { leases } => leases.iter().map(|l| l.sqft).sum(),
        }
    }

    /// Scheduled annual rent `exponent` years after the base year.
    pub fn scheduled_rent(&self, exponent: i64, rent_growth: Rate) -> Money {
        match self {
            IncomeSource::RentRoll { units } => {
                let monthly: Money = units.iter().map(|u| u.monthly_rent).sum();
                monthly * dec!(12) * growth_factor(rent_growth, exponent)
            }
            IncomeSource::Leases { leases } => leases
                .iter()
                .map(|l| {
                    let escalation = l.escalation_pct.map(pct_to_rate).unwrap_or(rent_growth);
                    l.annual_base_rent * growth_factor(escalation, exponent)
                })
                .sum(),
        }
    }

    fn validate(&self) -> ProformaResult<()> {
        match self {
            IncomeSource::RentRoll { units } => {
                if units.is_empty() {
                    return Err(ProformaError::InsufficientData(
                        "Rent roll must contain at least one unit".into(),
                    ));
                }
                for u in units {
                    check_amount("income.units", &format!("Unit '{}' rent", u.label), u.monthly_rent)?;
                    check_amount("income.units", &format!("Unit '{}' area", u.label), u.sqft)?;
                }
            }
            IncomeSource::Leases { leases } => {
                if leases.is_empty() {
                    return Err(ProformaError::InsufficientData(
                        "Lease schedule must contain at least one lease".into(),
                    ));
                }
                for l in leases {
                    check_amount(
                        "income.leases",
                        &format!("Lease '{}' rent", l.tenant),
                        l.annual_base_rent,
                    )?;
                    check_amount("income.leases", &format!("Lease '{}' area", l.tenant), l.sqft)?;
                    if l
                        .escalation_pct
                        .is_some_and(|e| e <= dec!(-100) || e > MAX_GROWTH_PCT)
                    {
                        return Err(ProformaError::invalid(
                            "income.leases",
                            format!(
                                "Lease '{}' escalation must exceed -100% and not exceed {MAX_GROWTH_PCT}%",
                                l.tenant
                            ),
                        ));
                    }
                }
            }
        }
        check_amount("income", "Base annual rent", self.scheduled_rent(0, Decimal::ZERO))?;
        check_amount("income", "Total area", self.total_sqft())
    }
}

/// `(1 + rate)^exponent`, computed directly rather than by repeated
/// multiplication so later years carry no accumulated rounding.
pub(crate) fn growth_factor(rate: Rate, exponent: i64) -> Decimal {
    if exponent <= 0 || rate.is_zero() {
        return Decimal::ONE;
    }
    (Decimal::ONE + rate).powi(exponent)
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Partner in a simple pro-rata equity split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPartner {
    pub name: String,
    pub share_pct: Percent,
}

/// Immutable set of underwriting assumptions for one acquisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssumptionSnapshot {
    #[serde(default)]
    pub property_name: String,
    pub purchase_price: Money,
    #[serde(default)]
    pub closing_costs: Money,
    #[serde(default)]
    pub immediate_repairs: Money,
    /// Down payment as a share of purchase price (100 = all cash)
    pub down_payment_pct: Percent,
    pub interest_rate_pct: Percent,
    pub loan_term_years: u32,
    pub hold_period_years: u32,
    pub vacancy_pct: Percent,
    pub management_pct: Percent,
    pub rent_growth_pct: Percent,
    pub expense_growth_pct: Percent,
    pub exit_cap_rate_pct: Percent,
    pub income: IncomeSource,
    /// Laundry, parking and similar income, grown with rents
    #[serde(default)]
    pub other_monthly_income: Money,
    /// Itemized annual operating expenses by category (management excluded)
    #[serde(default)]
    pub operating_expenses: BTreeMap<String, Money>,
    /// Broker and transfer costs at sale, share of exit value
    #[serde(default)]
    pub selling_costs_pct: Percent,
    /// Investor hurdle used for NPV
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_rate_pct: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquisition_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equity_partners: Vec<EquityPartner>,
}

impl AssumptionSnapshot {
    pub fn down_payment(&self) -> Money {
        self.purchase_price * pct_to_rate(self.down_payment_pct)
    }

    pub fn loan_amount(&self) -> Money {
        let loan = self.purchase_price - self.down_payment();
        loan.max(Decimal::ZERO)
    }

    pub fn is_leveraged(&self) -> bool {
        self.loan_amount() > Decimal::ZERO
    }

    /// Cash the buyer brings to closing: down payment, closing costs and
    /// immediate repairs.
    pub fn total_cash_required(&self) -> Money {
        self.down_payment() + self.closing_costs + self.immediate_repairs
    }

    /// Year-one itemized operating expenses (management excluded).
    pub fn base_fixed_expenses(&self) -> Money {
        self.operating_expenses.values().copied().sum()
    }

    pub fn unit_count(&self) -> usize {
        self.income.unit_count()
    }

    pub fn total_sqft(&self) -> Decimal {
        self.income.total_sqft()
    }

    pub fn rent_growth(&self) -> Rate {
        pct_to_rate(self.rent_growth_pct)
    }

    pub fn expense_growth(&self) -> Rate {
        pct_to_rate(self.expense_growth_pct)
    }

    /// Validate the snapshot, collecting warnings for unusual but legal
    /// assumptions.
    pub fn validate(&self, warnings: &mut Vec<String>) -> ProformaResult<()> {
        if self.purchase_price <= Decimal::ZERO {
            return Err(ProformaError::invalid(
                "purchase_price",
                "Purchase price must be positive",
            ));
        }
        for (field, value) in [
            ("purchase_price", self.purchase_price),
            ("closing_costs", self.closing_costs),
            ("immediate_repairs", self.immediate_repairs),
            ("other_monthly_income", self.other_monthly_income),
        ] {
            check_amount(field, "Amount", value)?;
        }

        if self.down_payment_pct < Decimal::ZERO || self.down_payment_pct > dec!(100) {
            return Err(ProformaError::invalid(
                "down_payment_pct",
                "Down payment must be between 0% and 100%",
            ));
        }
        if self.interest_rate_pct < Decimal::ZERO || self.interest_rate_pct > MAX_INTEREST_RATE_PCT {
            return Err(ProformaError::invalid(
                "interest_rate_pct",
                format!("Interest rate must be between 0% and {MAX_INTEREST_RATE_PCT}%"),
            ));
        }
        if self.is_leveraged() && self.loan_term_years == 0 {
            return Err(ProformaError::invalid(
                "loan_term_years",
                "Loan term must be at least 1 year when the purchase is financed",
            ));
        }
        if self.loan_term_years > MAX_LOAN_TERM_YEARS {
            return Err(ProformaError::invalid(
                "loan_term_years",
                format!("Loan term must not exceed {MAX_LOAN_TERM_YEARS} years"),
            ));
        }
        if self.exit_cap_rate_pct > Decimal::ZERO && self.exit_cap_rate_pct < MIN_EXIT_CAP_PCT {
            return Err(ProformaError::invalid(
                "exit_cap_rate_pct",
                format!("A positive exit cap rate must be at least {MIN_EXIT_CAP_PCT}%"),
            ));
        }
        if self.hold_period_years < 1 || self.hold_period_years > MAX_HOLD_YEARS {
            return Err(ProformaError::invalid(
                "hold_period_years",
                format!("Hold period must be between 1 and {MAX_HOLD_YEARS} years"),
            ));
        }

        for (field, value) in [
            ("vacancy_pct", self.vacancy_pct),
            ("management_pct", self.management_pct),
            ("selling_costs_pct", self.selling_costs_pct),
        ] {
            if value < Decimal::ZERO || value >= dec!(100) {
                return Err(ProformaError::invalid(
                    field,
                    "Must be between 0% and 100% (exclusive upper)",
                ));
            }
        }
        for (field, value) in [
            ("rent_growth_pct", self.rent_growth_pct),
            ("expense_growth_pct", self.expense_growth_pct),
        ] {
            if value <= dec!(-100) || value > MAX_GROWTH_PCT {
                return Err(ProformaError::invalid(
                    field,
                    format!("Growth must exceed -100% and not exceed {MAX_GROWTH_PCT}%"),
                ));
            }
        }
        if let Some(dr) = self.discount_rate_pct {
            if dr <= dec!(-100) {
                return Err(ProformaError::invalid(
                    "discount_rate_pct",
                    "Discount rate must exceed -100%",
                ));
            }
        }

        for (category, amount) in &self.operating_expenses {
            check_amount("operating_expenses", &format!("Expense '{category}'"), *amount)?;
        }
        check_amount("operating_expenses", "Total expenses", self.base_fixed_expenses())?;

        self.income.validate()?;

        if !self.equity_partners.is_empty() {
            if self.equity_partners.iter().any(|p| p.share_pct < Decimal::ZERO) {
                return Err(ProformaError::invalid(
                    "equity_partners",
                    "Partner shares must not be negative",
                ));
            }
            let total: Percent = self.equity_partners.iter().map(|p| p.share_pct).sum();
            if (total - dec!(100)).abs() > dec!(0.01) {
                return Err(ProformaError::invalid(
                    "equity_partners",
                    format!("Partner shares must sum to 100%, got {total}%"),
                ));
            }
        }

        // --- Warnings for unusual assumptions ---
        if self.exit_cap_rate_pct <= Decimal::ZERO {
            warnings.push(
                "Exit cap rate is not positive; no reversion value is modeled at sale".into(),
            );
        }
        if self.vacancy_pct > dec!(15) {
            warnings.push(format!(
                "Vacancy {}% exceeds 15%, above typical market norms",
                self.vacancy_pct
            ));
        }
        if self.is_leveraged() && self.loan_term_years < self.hold_period_years {
            warnings.push(format!(
                "Loan term of {} years is shorter than the {}-year hold; debt service stops once the loan is retired",
                self.loan_term_years, self.hold_period_years
            ));
        }
        if self.operating_expenses.is_empty() {
            warnings.push("No operating expenses itemized".into());
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// 12-unit walk-up: $2.3M, 25% down, 7% / 30 years.
    pub(crate) fn sample_snapshot() -> AssumptionSnapshot {
        let mut units = Vec::new();
        for i in 1..=6 {
            units.push(Unit {
                label: format!("1BR-{i}"),
                sqft: dec!(850),
                monthly_rent: dec!(1500),
            });
        }
        for i in 1..=6 {
            units.push(Unit {
                label: format!("2BR-{i}"),
                sqft: dec!(1000),
                monthly_rent: dec!(1700),
            });
        }

        let operating_expenses = BTreeMap::from([
            ("taxes".to_string(), dec!(28750)),
            ("insurance".to_string(), dec!(9600)),
            ("utilities".to_string(), dec!(18000)),
            ("repairs".to_string(), dec!(12000)),
            ("grounds".to_string(), dec!(4800)),
            ("reserves".to_string(), dec!(3600)),
            ("legal_accounting".to_string(), dec!(3765)),
        ]);

        AssumptionSnapshot {
            property_name: "Maple Court".into(),
            purchase_price: dec!(2300000),
            closing_costs: dec!(46000),
            immediate_repairs: dec!(25000),
            down_payment_pct: dec!(25),
            interest_rate_pct: dec!(7.0),
            loan_term_years: 30,
            hold_period_years: 5,
            vacancy_pct: dec!(5),
            management_pct: dec!(5),
            rent_growth_pct: dec!(3),
            expense_growth_pct: dec!(2.5),
            exit_cap_rate_pct: dec!(6.0),
            income: IncomeSource::RentRoll { units },
            other_monthly_income: dec!(208.33),
            operating_expenses,
            selling_costs_pct: dec!(2),
            discount_rate_pct: Some(dec!(8)),
            acquisition_date: None,
            equity_partners: Vec::new(),
        }
    }

    #[test]
    fn test_financing_figures() {
        let s = sample_snapshot();
        assert_eq!(s.down_payment(), dec!(575000));
        assert_eq!(s.loan_amount(), dec!(1725000));
        assert_eq!(s.total_cash_required(), dec!(646000));
        assert_eq!(s.base_fixed_expenses(), dec!(80515));
        assert_eq!(s.unit_count(), 12);
        assert_eq!(s.total_sqft(), dec!(11100));
    }

    #[test]
    fn test_rent_roll_scheduled_rent() {
        let s = sample_snapshot();
        assert_eq!(s.income.scheduled_rent(0, s.rent_growth()), dec!(230400));
        // 230400 * 1.03^2 = 244431.36
        assert_eq!(s.income.scheduled_rent(2, s.rent_growth()), dec!(244431.36));
    }

    #[test]
    fn test_lease_escalation_falls_back_to_rent_growth() {
        let income = IncomeSource::Leases {
            leases: vec![
                Lease {
                    tenant: "Anchor".into(),
                    sqft: dec!(10000),
                    annual_base_rent: dec!(100000),
                    escalation_pct: Some(dec!(2)),
                },
                Lease {
                    tenant: "Inline".into(),
                    sqft: dec!(2000),
                    annual_base_rent: dec!(50000),
                    escalation_pct: None,
                },
            ],
        };
        // 100000 * 1.02 + 50000 * 1.03 = 102000 + 51500
        assert_eq!(income.scheduled_rent(1, dec!(0.03)), dec!(153500));
        assert_eq!(income.unit_count(), 2);
        assert_eq!(income.total_sqft(), dec!(12000));
    }

    #[test]
    fn test_validate_accepts_sample() {
        let mut warnings = Vec::new();
        sample_snapshot().validate(&mut warnings).unwrap();
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }

    #[test]
    fn test_validate_rejects_zero_price() {
        let mut s = sample_snapshot();
        s.purchase_price = Decimal::ZERO;
        assert!(s.validate(&mut Vec::new()).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_rent_roll() {
        let mut s = sample_snapshot();
        s.income = IncomeSource::RentRoll { units: vec![] };
        let err = s.validate(&mut Vec::new()).unwrap_err();
        assert!(matches!(err, ProformaError::InsufficientData(_)));
    }

    #[test]
    fn test_validate_rejects_partner_shares_not_summing() {
        let mut s = sample_snapshot();
        s.equity_partners = vec![
            EquityPartner {
                name: "GP".into(),
                share_pct: dec!(10),
            },
            EquityPartner {
                name: "LP".into(),
                share_pct: dec!(80),
            },
        ];
        assert!(s.validate(&mut Vec::new()).is_err());
    }

    #[test]
    fn test_validate_rejects_extreme_interest_rate() {
        let mut s = sample_snapshot();
        s.interest_rate_pct = dec!(100000000000000000000000000);
        let err = s.validate(&mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("interest_rate_pct"));
        s.interest_rate_pct = MAX_INTEREST_RATE_PCT;
        s.validate(&mut Vec::new()).unwrap();
    }

    #[test]
    fn test_validate_rejects_runaway_loan_term() {
        let mut s = sample_snapshot();
        s.loan_term_years = 400_000_000;
        assert!(s.validate(&mut Vec::new()).is_err());
        s.loan_term_years = MAX_LOAN_TERM_YEARS;
        s.validate(&mut Vec::new()).unwrap();
    }

    #[test]
    fn test_validate_rejects_vanishing_exit_cap() {
        let mut s = sample_snapshot();
        s.exit_cap_rate_pct = Decimal::new(1, 22);
        let err = s.validate(&mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("exit_cap_rate_pct"));
        // Zero still means "no reversion", with a warning
        s.exit_cap_rate_pct = Decimal::ZERO;
        let mut warnings = Vec::new();
        s.validate(&mut warnings).unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_validate_rejects_amounts_above_ceiling() {
        let mut s = sample_snapshot();
        s.purchase_price = MAX_AMOUNT + Decimal::ONE;
        assert!(s.validate(&mut Vec::new()).is_err());

        let mut s = sample_snapshot();
        s.operating_expenses.insert("insurance".into(), MAX_AMOUNT * dec!(2));
        assert!(s.validate(&mut Vec::new()).is_err());

        let mut s = sample_snapshot();
        if let IncomeSource::RentRoll { units } = &mut s.income {
            units[0].monthly_rent = MAX_AMOUNT;
        }
        let err = s.validate(&mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("Base annual rent"));
    }

    #[test]
    fn test_validate_rejects_growth_above_ceiling() {
        let mut s = sample_snapshot();
        s.rent_growth_pct = MAX_GROWTH_PCT + Decimal::ONE;
        assert!(s.validate(&mut Vec::new()).is_err());
    }

    #[test]
    fn test_all_cash_needs_no_loan_term() {
        let mut s = sample_snapshot();
        s.down_payment_pct = dec!(100);
        s.loan_term_years = 0;
        assert!(!s.is_leveraged());
        s.validate(&mut Vec::new()).unwrap();
    }

    #[test]
    fn test_short_loan_term_warns() {
        let mut s = sample_snapshot();
        s.loan_term_years = 3;
        let mut warnings = Vec::new();
        s.validate(&mut warnings).unwrap();
        assert!(warnings.iter().any(|w| w.contains("shorter than")));
    }
}
