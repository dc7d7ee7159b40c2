//! Region store
//!
//! Source of truth for what the user has annotated so far. Regions are
//! keyed by id and kept in creation order; every mutation is validated
//! against the track bounds, the overlap policy, and the tag vocabulary,
//! and emits a change event for the presentation collaborator.

use crate::models::{AnnotationSet, Region};
use earmark_common::config::TagVocabulary;
use earmark_common::events::{EarmarkEvent, EventBus};
use earmark_common::{time, Error, Result};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

#[derive(Debug)]
pub struct RegionStore {
    regions: HashMap<Uuid, Region>,
    /// Creation order of the ids in `regions`
    order: Vec<Uuid>,
    track_duration: f64,
    allow_overlap: bool,
    vocabulary: TagVocabulary,
    event_bus: EventBus,
}

impl RegionStore {
    pub fn new(
        track_duration: f64,
        allow_overlap: bool,
        vocabulary: TagVocabulary,
        event_bus: EventBus,
    ) -> Self {
        Self {
            regions: HashMap::new(),
            order: Vec::new(),
            track_duration,
            allow_overlap,
            vocabulary,
            event_bus,
        }
    }

    /// Create a region from a completed draw gesture
    ///
    /// Fails with `InvalidInterval` when the bounds are empty, inverted, or
    /// outside the track; with `OverlapConflict` when the overlap policy
    /// disallows intersecting regions. On failure the store is unchanged.
    pub fn create_region(&mut self, start_time: f64, end_time: f64) -> Result<Region> {
        self.validate_interval(start_time, end_time, None)?;

        let region = Region {
            id: Uuid::new_v4(),
            start_time,
            end_time,
            tags: BTreeSet::new(),
            created_at: time::now(),
        };
        self.regions.insert(region.id, region.clone());
        self.order.push(region.id);

        tracing::debug!(region_id = %region.id, start_time, end_time, "region created");
        self.event_bus.emit_lossy(EarmarkEvent::RegionCreated {
            region_id: region.id,
            start_time,
            end_time,
            timestamp: time::now(),
        });
        Ok(region)
    }

    /// Replace a region's bounds (boundary drag)
    ///
    /// The region's own previous interval is excluded from the overlap
    /// check, so shrinking or nudging a region never conflicts with itself.
    pub fn update_interval(&mut self, region_id: Uuid, start_time: f64, end_time: f64) -> Result<()> {
        if !self.regions.contains_key(&region_id) {
            return Err(Error::UnknownRegion(region_id));
        }
        self.validate_interval(start_time, end_time, Some(region_id))?;

        let region = self
            .regions
            .get_mut(&region_id)
            .ok_or(Error::UnknownRegion(region_id))?;
        region.start_time = start_time;
        region.end_time = end_time;

        tracing::debug!(%region_id, start_time, end_time, "region bounds updated");
        self.event_bus.emit_lossy(EarmarkEvent::RegionIntervalChanged {
            region_id,
            start_time,
            end_time,
            timestamp: time::now(),
        });
        Ok(())
    }

    /// Replace a region's tag set
    ///
    /// Fails with `UnknownRegion` for an absent id and `InvalidTag` when any
    /// tag falls outside the task vocabulary; partial assignment never
    /// happens.
    pub fn assign_tags(&mut self, region_id: Uuid, tags: BTreeSet<String>) -> Result<()> {
        if !self.regions.contains_key(&region_id) {
            return Err(Error::UnknownRegion(region_id));
        }
        for tag in &tags {
            if !self.vocabulary.contains(tag) {
                return Err(Error::InvalidTag(tag.clone()));
            }
        }

        let region = self
            .regions
            .get_mut(&region_id)
            .ok_or(Error::UnknownRegion(region_id))?;
        region.tags = tags.clone();

        tracing::debug!(%region_id, ?tags, "tags assigned");
        self.event_bus.emit_lossy(EarmarkEvent::RegionTagsAssigned {
            region_id,
            tags,
            timestamp: time::now(),
        });
        Ok(())
    }

    /// Remove a region
    pub fn delete_region(&mut self, region_id: Uuid) -> Result<()> {
        if self.regions.remove(&region_id).is_none() {
            return Err(Error::UnknownRegion(region_id));
        }
        self.order.retain(|id| *id != region_id);

        tracing::debug!(%region_id, "region deleted");
        self.event_bus.emit_lossy(EarmarkEvent::RegionDeleted {
            region_id,
            timestamp: time::now(),
        });
        Ok(())
    }

    pub fn get(&self, region_id: Uuid) -> Option<&Region> {
        self.regions.get(&region_id)
    }

    pub fn contains(&self, region_id: Uuid) -> bool {
        self.regions.contains_key(&region_id)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Immutable copy of the current regions in creation order
    ///
    /// Scoring reads this snapshot, never the live store, so it cannot
    /// observe a partially-applied mutation.
    pub fn snapshot(&self) -> AnnotationSet {
        let regions = self
            .order
            .iter()
            .filter_map(|id| self.regions.get(id).cloned())
            .collect();
        AnnotationSet::new(regions)
    }

    fn validate_interval(&self, start: f64, end: f64, exclude: Option<Uuid>) -> Result<()> {
        if !start.is_finite()
            || !end.is_finite()
            || start < 0.0
            || start >= end
            || end > self.track_duration
        {
            return Err(Error::InvalidInterval {
                start,
                end,
                track_duration: self.track_duration,
            });
        }
        if !self.allow_overlap {
            for region in self.regions.values() {
                if Some(region.id) == exclude {
                    continue;
                }
                if region.overlaps(start, end) {
                    return Err(Error::OverlapConflict {
                        start,
                        end,
                        existing: region.id,
                    });
                }
            }
        }
        Ok(())
    }
}
