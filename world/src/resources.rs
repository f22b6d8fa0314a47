//! Battery, water and tool accounting for rechargeable agents.

use crisis_response_core::{RejectionReason, ResourceLevel, Terrain};

use crate::registry::Entity;

pub(crate) const DEFAULT_BATTERY: u32 = 100;
pub(crate) const DEFAULT_WATER: u32 = 100;
pub(crate) const DEFAULT_TOOLS: u32 = 3;

const DRONE_MOVE_BATTERY: u32 = 2;
const TRUCK_MOVE_BATTERY: u32 = 1;
const EXTINGUISH_WATER: u32 = 25;
const CLEAR_TOOLS: u32 = 1;
const LOW_BATTERY_PERCENT: u64 = 10;

/// Depletable resource that only a depot refills.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Gauge {
    current: u32,
    max: u32,
}

impl Gauge {
    pub(crate) const fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    pub(crate) const fn current(&self) -> u32 {
        self.current
    }

    pub(crate) const fn level(&self) -> ResourceLevel {
        ResourceLevel {
            current: self.current,
            max: self.max,
        }
    }

    fn spend(&mut self, amount: u32) {
        debug_assert!(amount <= self.current, "gauge overdrawn");
        self.current = self.current.saturating_sub(amount);
    }

    fn refill(&mut self) {
        self.current = self.max;
    }

    /// A battery below a tenth of its capacity cannot power movement.
    pub(crate) const fn is_depleted(&self) -> bool {
        (self.current as u64) * 100 < (self.max as u64) * LOW_BATTERY_PERCENT
    }
}

/// Resource-consuming activities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Activity {
    Move,
    Extinguish,
    Clear,
}

/// Units spent by a single activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Consumption {
    pub(crate) battery: u32,
    pub(crate) water: u32,
    pub(crate) tools: u32,
}

impl Consumption {
    pub(crate) const fn is_empty(&self) -> bool {
        self.battery == 0 && self.water == 0 && self.tools == 0
    }
}

/// Checks that the entity can afford the activity.
///
/// Nothing is spent; [`consume`] applies the same table once every other
/// precondition of the command holds.
pub(crate) fn affordable(
    entity: &Entity,
    activity: Activity,
) -> Result<Consumption, RejectionReason> {
    match (entity, activity) {
        (Entity::Drone(drone), Activity::Move) => {
            battery_for_move(drone.battery, DRONE_MOVE_BATTERY)
        }
        (Entity::Truck(truck), Activity::Move) => {
            battery_for_move(truck.battery, TRUCK_MOVE_BATTERY)
        }
        (Entity::Medic(_), Activity::Move) => Ok(Consumption::default()),
        (Entity::Truck(truck), Activity::Extinguish) => {
            if truck.water.current() < EXTINGUISH_WATER {
                return Err(RejectionReason::InsufficientWater {
                    available: truck.water.current(),
                    required: EXTINGUISH_WATER,
                });
            }
            Ok(Consumption {
                water: EXTINGUISH_WATER,
                ..Consumption::default()
            })
        }
        (Entity::Truck(truck), Activity::Clear) => {
            if truck.tools.current() < CLEAR_TOOLS {
                return Err(RejectionReason::InsufficientTools {
                    available: truck.tools.current(),
                    required: CLEAR_TOOLS,
                });
            }
            Ok(Consumption {
                tools: CLEAR_TOOLS,
                ..Consumption::default()
            })
        }
        (Entity::Survivor(_), _) => Err(RejectionReason::NotAnAgent),
        (Entity::Drone(_) | Entity::Medic(_), Activity::Extinguish | Activity::Clear) => {
            Err(RejectionReason::Incapable)
        }
    }
}

/// Spends the resources of an activity, failing without side effects when
/// the entity cannot afford it.
pub(crate) fn consume(
    entity: &mut Entity,
    activity: Activity,
) -> Result<Consumption, RejectionReason> {
    let consumption = affordable(entity, activity)?;
    match entity {
        Entity::Drone(drone) => drone.battery.spend(consumption.battery),
        Entity::Truck(truck) => {
            truck.battery.spend(consumption.battery);
            truck.water.spend(consumption.water);
            truck.tools.spend(consumption.tools);
        }
        Entity::Medic(_) | Entity::Survivor(_) => {}
    }
    Ok(consumption)
}

/// Resets every gauge of the entity to its maximum. Only legal on a depot.
pub(crate) fn recharge(entity: &mut Entity, terrain: Terrain) -> Result<(), RejectionReason> {
    match entity {
        Entity::Survivor(_) => return Err(RejectionReason::NotAnAgent),
        Entity::Medic(_) => return Err(RejectionReason::Incapable),
        Entity::Drone(_) | Entity::Truck(_) => {}
    }
    if terrain != Terrain::Depot {
        return Err(RejectionReason::NotOnDepot);
    }

    match entity {
        Entity::Drone(drone) => drone.battery.refill(),
        Entity::Truck(truck) => {
            truck.battery.refill();
            truck.water.refill();
            truck.tools.refill();
        }
        Entity::Medic(_) | Entity::Survivor(_) => {}
    }
    Ok(())
}

fn battery_for_move(battery: Gauge, cost: u32) -> Result<Consumption, RejectionReason> {
    if battery.is_depleted() || battery.current() < cost {
        return Err(RejectionReason::Depleted);
    }
    Ok(Consumption {
        battery: cost,
        ..Consumption::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Drone, Truck};
    use crisis_response_core::CellCoord;

    fn truck(water: u32) -> Entity {
        let mut truck = Truck::new(CellCoord::new(0, 0), DEFAULT_BATTERY, DEFAULT_WATER, 3);
        truck.water = Gauge {
            current: water,
            max: DEFAULT_WATER,
        };
        Entity::Truck(truck)
    }

    #[test]
    fn extinguish_is_all_or_nothing() {
        let mut entity = truck(20);
        assert_eq!(
            consume(&mut entity, Activity::Extinguish),
            Err(RejectionReason::InsufficientWater {
                available: 20,
                required: 25,
            })
        );
        let Entity::Truck(truck) = &entity else {
            panic!("expected truck");
        };
        assert_eq!(truck.water.current(), 20);
    }

    #[test]
    fn drones_burn_twice_the_battery_of_trucks() {
        let mut drone = Entity::Drone(Drone::new(CellCoord::new(0, 0), DEFAULT_BATTERY));
        let mut truck = truck(DEFAULT_WATER);

        let drone_cost = consume(&mut drone, Activity::Move).expect("drone moves");
        let truck_cost = consume(&mut truck, Activity::Move).expect("truck moves");

        assert_eq!(drone_cost.battery, 2);
        assert_eq!(truck_cost.battery, 1);
    }

    #[test]
    fn low_battery_blocks_movement() {
        let mut drone = Drone::new(CellCoord::new(0, 0), DEFAULT_BATTERY);
        drone.battery = Gauge {
            current: 9,
            max: DEFAULT_BATTERY,
        };
        let mut entity = Entity::Drone(drone);

        assert_eq!(
            consume(&mut entity, Activity::Move),
            Err(RejectionReason::Depleted)
        );
    }

    #[test]
    fn recharge_requires_depot_and_restores_maxima() {
        let mut entity = truck(0);
        assert_eq!(
            recharge(&mut entity, Terrain::Empty),
            Err(RejectionReason::NotOnDepot)
        );

        recharge(&mut entity, Terrain::Depot).expect("recharge on depot");
        let Entity::Truck(truck) = &entity else {
            panic!("expected truck");
        };
        assert_eq!(truck.water.current(), DEFAULT_WATER);
        assert_eq!(truck.battery.current(), DEFAULT_BATTERY);
    }
}
