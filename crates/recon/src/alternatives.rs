//! Nearby on-panel suggestions for providers matched outside the panel.

use log::debug;
use ordered_float::OrderedFloat;

use crate::config::AlternativesConfig;
use crate::directory::PanelDirectory;
use crate::error::GeocodeUnavailable;
use crate::model::{AlternativeProvider, PanelProvider};

/// Distance collaborator. How locations are resolved is up to the
/// implementation; the finder only needs kilometers or a refusal.
pub trait DistanceSource: Send + Sync {
    fn distance_km(&self, from: &PanelProvider, to: &PanelProvider) -> Result<f64, GeocodeUnavailable>;
}

impl<F> DistanceSource for F
where
    F: Fn(&PanelProvider, &PanelProvider) -> Result<f64, GeocodeUnavailable> + Send + Sync,
{
    fn distance_km(&self, from: &PanelProvider, to: &PanelProvider) -> Result<f64, GeocodeUnavailable> {
        self(from, to)
    }
}

/// No locations available: every alternative search comes back empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDistance;

impl DistanceSource for NoDistance {
    fn distance_km(&self, from: &PanelProvider, _to: &PanelProvider) -> Result<f64, GeocodeUnavailable> {
        Err(GeocodeUnavailable {
            address: from.address.clone(),
        })
    }
}

/// Up to `max_alternatives` on-panel providers within `radius_km` of
/// `matched`, nearest first (ties by code), ranked from 1.
///
/// Returns nothing when `matched` is itself on the panel. A provider the
/// distance source cannot place is skipped, as is any negative or
/// non-finite distance.
pub fn find_alternatives(
    matched: &PanelProvider,
    directory: &PanelDirectory,
    config: &AlternativesConfig,
    distance: &dyn DistanceSource,
) -> Vec<AlternativeProvider> {
    if matched.is_on_panel() {
        return Vec::new();
    }

    let mut nearby: Vec<(f64, &PanelProvider)> = Vec::new();
    for candidate in directory.on_panel() {
        if candidate.code == matched.code {
            continue;
        }
        match distance.distance_km(matched, candidate) {
            Ok(km) if km.is_finite() && km >= 0.0 => {
                if km <= config.radius_km {
                    nearby.push((km, candidate));
                }
            }
            Ok(km) => {
                debug!("{} -> {}: ignoring distance {km}", matched.code, candidate.code);
            }
            Err(e) => {
                debug!("{} -> {}: {e}", matched.code, candidate.code);
            }
        }
    }

    nearby.sort_by(|a, b| (OrderedFloat(a.0), &a.1.code).cmp(&(OrderedFloat(b.0), &b.1.code)));

    nearby
        .into_iter()
        .take(config.max_alternatives)
        .enumerate()
        .map(|(i, (km, p))| AlternativeProvider {
            panel_provider_code: p.code.clone(),
            name: p.name.clone(),
            distance_km: km,
            rank: i + 1,
        })
        .collect()
}
