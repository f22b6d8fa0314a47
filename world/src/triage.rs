//! Bounded hospital queues that admit and serve survivors.

use std::collections::VecDeque;

use crisis_response_core::{CellCoord, EntityId, HospitalId, HospitalSnapshot};

/// Admission refused because the queue already holds `capacity` survivors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Overflow {
    pub(crate) overflow_count: u64,
}

#[derive(Clone, Debug)]
pub(crate) struct Hospital {
    id: HospitalId,
    cell: CellCoord,
    capacity: u32,
    service_rate: u32,
    queue: VecDeque<EntityId>,
    overflow_count: u64,
}

impl Hospital {
    pub(crate) fn new(id: HospitalId, cell: CellCoord, capacity: u32, service_rate: u32) -> Self {
        Self {
            id,
            cell,
            capacity,
            service_rate,
            queue: VecDeque::new(),
            overflow_count: 0,
        }
    }

    pub(crate) const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Enqueues the survivor and returns its position in the queue.
    ///
    /// A full queue counts the overflow and leaves the queue untouched.
    pub(crate) fn admit(&mut self, survivor: EntityId) -> Result<usize, Overflow> {
        if self.queue.len() >= self.capacity as usize {
            self.overflow_count += 1;
            return Err(Overflow {
                overflow_count: self.overflow_count,
            });
        }

        self.queue.push_back(survivor);
        Ok(self.queue.len() - 1)
    }

    /// Serves up to `service_rate` survivors from the front of the queue.
    pub(crate) fn drain(&mut self, out: &mut Vec<EntityId>) {
        let served = self.queue.len().min(self.service_rate as usize);
        out.extend(self.queue.drain(..served));
    }

    pub(crate) fn snapshot(&self) -> HospitalSnapshot {
        HospitalSnapshot {
            id: self.id,
            cell: self.cell,
            capacity: self.capacity,
            service_rate: self.service_rate,
            queue: self.queue.iter().copied().collect(),
            overflow_count: self.overflow_count,
        }
    }
}

/// Hospitals of the world kept in ascending identifier order.
#[derive(Clone, Debug, Default)]
pub(crate) struct Triage {
    hospitals: Vec<Hospital>,
}

impl Triage {
    /// Registers a hospital, refusing an identifier already in use.
    pub(crate) fn insert(&mut self, hospital: Hospital) -> Result<(), HospitalId> {
        match self
            .hospitals
            .binary_search_by_key(&hospital.id, |existing| existing.id)
        {
            Ok(_) => Err(hospital.id),
            Err(index) => {
                self.hospitals.insert(index, hospital);
                Ok(())
            }
        }
    }

    pub(crate) fn get(&self, id: HospitalId) -> Option<&Hospital> {
        self.hospitals
            .binary_search_by_key(&id, |hospital| hospital.id)
            .ok()
            .map(|index| &self.hospitals[index])
    }

    pub(crate) fn get_mut(&mut self, id: HospitalId) -> Option<&mut Hospital> {
        self.hospitals
            .binary_search_by_key(&id, |hospital| hospital.id)
            .ok()
            .map(move |index| &mut self.hospitals[index])
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Hospital> {
        self.hospitals.iter()
    }

    /// Serves every hospital in identifier order, reporting `(survivor,
    /// hospital)` pairs in service order.
    pub(crate) fn drain_all(&mut self, out: &mut Vec<(EntityId, HospitalId)>) {
        let mut served = Vec::new();
        for hospital in &mut self.hospitals {
            served.clear();
            hospital.drain(&mut served);
            out.extend(served.iter().map(|survivor| (*survivor, hospital.id)));
        }
    }
}
