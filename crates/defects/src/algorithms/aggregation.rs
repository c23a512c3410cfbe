use crate::{
    algorithms::regions::RegionStats,
    kind::DefectKind,
    types::{AggregatedMetrics, ClassMetrics, CrackMetrics, HoleMetrics, LargestCrack, ShapeInstance},
};

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Reduce the instance list to its summary.
///
/// `largest_region` is the biggest labeled component of the cleaned mask; it
/// only feeds the crack headline (orientation and region area).
pub fn aggregate(
    kind: DefectKind,
    instances: &[ShapeInstance],
    largest_region: Option<&RegionStats>,
) -> AggregatedMetrics {
    let areas: Vec<f64> = instances.iter().map(|i| i.area).collect();
    let total_area: f64 = areas.iter().sum();

    let class = match kind {
        DefectKind::Crack => ClassMetrics::Crack(crack_metrics(instances, largest_region)),
        DefectKind::Hole => ClassMetrics::Hole(hole_metrics(instances)),
        DefectKind::Grain => ClassMetrics::Grain,
    };

    AggregatedMetrics {
        count: instances.len(),
        mean_area: mean(&areas),
        total_area,
        areas,
        class,
    }
}

fn hole_metrics(instances: &[ShapeInstance]) -> HoleMetrics {
    let circularities: Vec<f64> = instances.iter().filter_map(|i| i.circularity).collect();
    HoleMetrics {
        mean_circularity: mean(&circularities),
        circularities,
    }
}

fn crack_metrics(instances: &[ShapeInstance], largest_region: Option<&RegionStats>) -> CrackMetrics {
    let widths: Vec<f64> = instances
        .iter()
        .map(|i| i.width.map(|w| w.max).unwrap_or(0.0))
        .collect();
    let lengths: Vec<f64> = instances
        .iter()
        .map(|i| i.length.unwrap_or(i.perimeter))
        .collect();

    let largest = largest_region.and_then(|region| {
        // First instance with the largest polygon area
        let (index, instance) = instances
            .iter()
            .enumerate()
            .reduce(|best, item| if item.1.area > best.1.area { item } else { best })?;
        let width = instance.width.unwrap_or_default();
        let max_length = lengths.iter().copied().fold(0.0, f64::max);
        let angle = region.major_axis_angle();

        Some(LargestCrack {
            index,
            region_area: region.pixel_count,
            angle,
            orientation: region.orientation(),
            max_length,
            max_width: width.max,
            min_width: width.min,
            mean_width: width.mean,
            length_to_max_width_ratio: if width.max > 0.0 { max_length / width.max } else { 0.0 },
        })
    });

    CrackMetrics {
        mean_width: mean(&widths),
        widths,
        lengths,
        largest,
    }
}
