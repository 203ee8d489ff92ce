//! Frequentist and Bayesian tests behind the chart annotations.

pub mod bayes;
pub mod contingency;
pub mod format;
pub mod location;
pub mod normality;
pub mod resample;
