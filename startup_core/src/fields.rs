use std::fmt;

/// Every numeric metric a delta may target.
///
/// Content refers to metrics by name; names are resolved against this
/// registry when content is loaded, so an unknown name is rejected before
/// any state is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricField {
    Balance,
    MonthlyRevenue,
    MonthlyExpenses,
    Users,
    Headcount,
    Debt,
    ProductQuality,
    BrandAwareness,
    TeamMorale,
    GrowthRate,
    ChurnRate,
}

/// How a metric is stored and which bound table governs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Whole units (dollars, people). Deltas are rounded.
    Integer,
    /// Score on a 0-100 style scale.
    Percent,
    /// Fraction on a 0-1 style scale.
    Rate,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::Percent => "percent",
            FieldKind::Rate => "rate",
        }
    }
}

impl MetricField {
    pub const COUNT: usize = 11;

    pub const ALL: [MetricField; Self::COUNT] = [
        MetricField::Balance,
        MetricField::MonthlyRevenue,
        MetricField::MonthlyExpenses,
        MetricField::Users,
        MetricField::Headcount,
        MetricField::Debt,
        MetricField::ProductQuality,
        MetricField::BrandAwareness,
        MetricField::TeamMorale,
        MetricField::GrowthRate,
        MetricField::ChurnRate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetricField::Balance => "balance",
            MetricField::MonthlyRevenue => "monthly_revenue",
            MetricField::MonthlyExpenses => "monthly_expenses",
            MetricField::Users => "users",
            MetricField::Headcount => "headcount",
            MetricField::Debt => "debt",
            MetricField::ProductQuality => "product_quality",
            MetricField::BrandAwareness => "brand_awareness",
            MetricField::TeamMorale => "team_morale",
            MetricField::GrowthRate => "growth_rate",
            MetricField::ChurnRate => "churn_rate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|field| field.name() == name)
    }

    pub fn kind(self) -> FieldKind {
        match self {
            MetricField::Balance
            | MetricField::MonthlyRevenue
            | MetricField::MonthlyExpenses
            | MetricField::Users
            | MetricField::Headcount
            | MetricField::Debt => FieldKind::Integer,
            MetricField::ProductQuality | MetricField::BrandAwareness | MetricField::TeamMorale => {
                FieldKind::Percent
            }
            MetricField::GrowthRate | MetricField::ChurnRate => FieldKind::Rate,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for MetricField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inclusive range a metric is clamped into. `max: None` means unbounded above.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub min: f64,
    pub max: Option<f64>,
}

impl Bound {
    pub const fn new(min: f64, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        let floored = if value < self.min { self.min } else { value };
        match self.max {
            Some(max) if floored > max => max,
            _ => floored,
        }
    }

    /// Position of `value` inside the range as 0.0-1.0. `None` when unbounded.
    pub fn normalize(&self, value: f64) -> Option<f64> {
        let max = self.max?;
        let span = (max - self.min).max(f64::EPSILON);
        Some(((value - self.min) / span).clamp(0.0, 1.0))
    }
}

/// Resolved bound for every metric, indexed by [`MetricField`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBounds {
    bounds: [Bound; MetricField::COUNT],
}

impl FieldBounds {
    pub fn get(&self, field: MetricField) -> Bound {
        self.bounds[field.slot()]
    }

    pub fn with(mut self, field: MetricField, bound: Bound) -> Self {
        self.set(field, bound);
        self
    }

    pub(crate) fn set(&mut self, field: MetricField, bound: Bound) {
        self.bounds[field.slot()] = bound;
    }
}

impl Default for FieldBounds {
    fn default() -> Self {
        let mut bounds = [Bound::new(0.0, None); MetricField::COUNT];
        for field in MetricField::ALL {
            bounds[field.slot()] = match field.kind() {
                FieldKind::Integer => Bound::new(0.0, None),
                FieldKind::Percent => Bound::new(0.0, Some(100.0)),
                FieldKind::Rate => Bound::new(0.0, Some(1.0)),
            };
        }
        Self { bounds }
    }
}
