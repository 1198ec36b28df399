//! Experiment data model
//!
//! A [`Dataset`] is split into one [`Partition`] per arm. Partitions are never
//! mutated: filtering produces a new partition which the caller threads forward
//! through an [`ArmPair`], keyed by [`Arm`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::descriptive;
use crate::errors::{StatsError, StatsResult};
use crate::types::{Arm, GroupLabels};

/// A single experiment unit: its group label and numeric fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// Row index in the source dataset
    pub row: usize,
    /// Group label as it appears in the source
    pub group: String,
    /// Numeric variables by name
    pub values: BTreeMap<String, f64>,
}

impl Observation {
    pub fn new<K, I>(row: usize, group: impl Into<String>, values: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        Self {
            row,
            group: group.into(),
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn value(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied()
    }
}

/// Ordered collection of observations from both arms
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    observations: Vec<Observation>,
}

impl Dataset {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    /// Build a dataset from a label column and named numeric columns
    ///
    /// # Arguments
    /// * `groups` - Group label per row
    /// * `columns` - (name, values) pairs, each with one value per row
    pub fn from_columns<S: AsRef<str>>(
        groups: &[S],
        columns: &[(&str, Vec<f64>)],
    ) -> StatsResult<Self> {
        for (name, values) in columns {
            if values.len() != groups.len() {
                return Err(StatsError::InvalidInput(format!(
                    "column '{}' has {} values, expected {}",
                    name,
                    values.len(),
                    groups.len()
                )));
            }
        }

        let observations = groups
            .iter()
            .enumerate()
            .map(|(row, group)| {
                Observation::new(
                    row,
                    group.as_ref(),
                    columns.iter().map(|(name, values)| (*name, values[row])),
                )
            })
            .collect();

        Ok(Self { observations })
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Fail with `MissingVariable` unless some observation carries `variable`
    pub fn require_variable(&self, variable: &str) -> StatsResult<()> {
        if self
            .observations
            .iter()
            .any(|o| o.values.contains_key(variable))
        {
            Ok(())
        } else {
            Err(StatsError::MissingVariable(variable.to_string()))
        }
    }

    /// Split into the two arms by group label.
    ///
    /// Every row must carry one of the two configured labels.
    pub fn split(&self, labels: &GroupLabels) -> StatsResult<ArmPair> {
        labels.validate()?;

        let mut control = Vec::new();
        let mut treatment = Vec::new();
        for obs in &self.observations {
            match labels.arm_for(&obs.group) {
                Some(Arm::Control) => control.push(obs.clone()),
                Some(Arm::Treatment) => treatment.push(obs.clone()),
                None => {
                    return Err(StatsError::UnknownGroupLabel {
                        label: obs.group.clone(),
                        row: obs.row,
                    })
                }
            }
        }

        Ok(ArmPair {
            control: Partition::new(Arm::Control, labels.label(Arm::Control), control),
            treatment: Partition::new(Arm::Treatment, labels.label(Arm::Treatment), treatment),
        })
    }

    /// Working dataset: control rows followed by treatment rows
    pub fn combine(control: &Partition, treatment: &Partition) -> Dataset {
        let observations = control
            .observations()
            .iter()
            .chain(treatment.observations())
            .cloned()
            .collect();
        Dataset { observations }
    }

    /// Per-arm summary of `variable`, control first
    pub fn summarize(&self, variable: &str, labels: &GroupLabels) -> StatsResult<[GroupSummary; 2]> {
        self.require_variable(variable)?;
        let pair = self.split(labels)?;
        Ok([
            pair.control.summary(variable)?,
            pair.treatment.summary(variable)?,
        ])
    }
}

/// Observations of one arm at one point in the workflow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Partition {
    arm: Arm,
    label: String,
    observations: Vec<Observation>,
}

impl Partition {
    pub fn new(arm: Arm, label: impl Into<String>, observations: Vec<Observation>) -> Self {
        Self {
            arm,
            label: label.into(),
            observations,
        }
    }

    /// Partition of bare values under a single field name
    pub fn from_values(arm: Arm, label: impl Into<String>, field: &str, values: &[f64]) -> Self {
        let label = label.into();
        let observations = values
            .iter()
            .enumerate()
            .map(|(row, &v)| Observation::new(row, label.clone(), [(field, v)]))
            .collect();
        Self {
            arm,
            label,
            observations,
        }
    }

    pub fn arm(&self) -> Arm {
        self.arm
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Values of `field`, skipping rows where it is absent or NaN
    pub fn values(&self, field: &str) -> StatsResult<Vec<f64>> {
        let mut found = self.observations.is_empty();
        let mut out = Vec::with_capacity(self.observations.len());
        for obs in &self.observations {
            if let Some(v) = obs.value(field) {
                found = true;
                if !v.is_nan() {
                    out.push(v);
                }
            }
        }
        if !found {
            return Err(StatsError::MissingVariable(field.to_string()));
        }
        Ok(out)
    }

    /// New partition keeping rows whose `field` value satisfies `keep`.
    ///
    /// Rows where the field is absent or NaN are dropped.
    pub fn retain(&self, field: &str, keep: impl Fn(f64) -> bool) -> Partition {
        let observations = self
            .observations
            .iter()
            .filter(|o| o.value(field).is_some_and(|v| !v.is_nan() && keep(v)))
            .cloned()
            .collect();
        Partition {
            arm: self.arm,
            label: self.label.clone(),
            observations,
        }
    }

    /// Fail with `EmptyPartition` when fewer than `required` rows remain
    pub fn require(&self, required: usize) -> StatsResult<()> {
        if self.len() < required {
            return Err(StatsError::EmptyPartition {
                arm: self.arm,
                n: self.len(),
                required,
            });
        }
        Ok(())
    }

    /// Summary statistics of `field` for this arm
    pub fn summary(&self, field: &str) -> StatsResult<GroupSummary> {
        let values = self.values(field)?;
        let sorted = descriptive::sorted(&values);
        Ok(GroupSummary {
            arm: self.arm,
            label: self.label.clone(),
            count: values.len(),
            mean: descriptive::mean(&values),
            std: descriptive::std_dev(&values, 1),
            median: descriptive::quantile_sorted(&sorted, 0.5),
            min: sorted.first().copied().unwrap_or(f64::NAN),
            max: sorted.last().copied().unwrap_or(f64::NAN),
        })
    }
}

/// The two partitions of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArmPair {
    control: Partition,
    treatment: Partition,
}

impl ArmPair {
    pub fn new(control: Partition, treatment: Partition) -> StatsResult<Self> {
        if control.arm() != Arm::Control || treatment.arm() != Arm::Treatment {
            return Err(StatsError::InvalidInput(format!(
                "arm pair expects (control, treatment), got ({}, {})",
                control.arm(),
                treatment.arm()
            )));
        }
        GroupLabels::new(control.label(), treatment.label()).validate()?;
        for partition in [&control, &treatment] {
            if let Some(obs) = partition
                .observations()
                .iter()
                .find(|o| o.group != partition.label())
            {
                return Err(StatsError::InvalidInput(format!(
                    "row {} has group '{}' but sits in the {} arm labelled '{}'",
                    obs.row,
                    obs.group,
                    partition.arm(),
                    partition.label()
                )));
            }
        }
        Ok(Self { control, treatment })
    }

    pub fn control(&self) -> &Partition {
        &self.control
    }

    pub fn treatment(&self) -> &Partition {
        &self.treatment
    }

    pub fn get(&self, arm: Arm) -> &Partition {
        match arm {
            Arm::Control => &self.control,
            Arm::Treatment => &self.treatment,
        }
    }

    /// Replace the partition in the slot named by its own arm key
    pub fn with_partition(self, partition: Partition) -> ArmPair {
        match partition.arm() {
            Arm::Control => ArmPair {
                control: partition,
                treatment: self.treatment,
            },
            Arm::Treatment => ArmPair {
                control: self.control,
                treatment: partition,
            },
        }
    }

    pub fn combine(&self) -> Dataset {
        Dataset::combine(&self.control, &self.treatment)
    }

    pub fn labels(&self) -> GroupLabels {
        GroupLabels::new(self.control.label(), self.treatment.label())
    }
}

/// Per-arm summary of one variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub arm: Arm,
    pub label: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}
