//! Fleet-wide statistics.

use tenantctl_common::types::{ContainerRecord, ContainerStatus, FleetStats};

/// Folds resolved records into fleet counters.
///
/// `records` must come from a single [`RuntimeView`](crate::resolver::RuntimeView)
/// so the counters describe one point in time.
#[must_use]
pub fn aggregate(total_users: usize, records: &[ContainerRecord]) -> FleetStats {
    records.iter().fold(
        FleetStats {
            total_users,
            ..FleetStats::default()
        },
        |mut stats, record| {
            stats.total_containers += 1;
            if record.status == ContainerStatus::Running {
                stats.running_containers += 1;
            } else if record.status.is_stopped() {
                stats.stopped_containers += 1;
            }
            stats
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: ContainerStatus) -> ContainerRecord {
        ContainerRecord {
            id: None,
            name: "c".into(),
            user_info: None,
            image: "nginx:alpine".into(),
            status,
            ports: String::new(),
            created: None,
            docker_available: status != ContainerStatus::DockerUnavailable,
            actions: status.available_actions(),
        }
    }

    #[test]
    fn mixed_fleet_counts() {
        let records: Vec<_> = [
            ContainerStatus::Running,
            ContainerStatus::Running,
            ContainerStatus::Exited,
            ContainerStatus::NotCreated,
            ContainerStatus::Created,
        ]
        .into_iter()
        .map(record)
        .collect();

        let stats = aggregate(5, &records);
        assert_eq!(
            stats,
            FleetStats {
                total_users: 5,
                total_containers: 5,
                running_containers: 2,
                stopped_containers: 2,
            }
        );
    }

    #[test]
    fn empty_fleet_is_all_zero() {
        assert_eq!(aggregate(0, &[]), FleetStats::default());
    }

    #[test]
    fn unavailable_records_are_neither_running_nor_stopped() {
        let records = vec![record(ContainerStatus::DockerUnavailable); 3];
        let stats = aggregate(3, &records);
        assert_eq!(stats.total_containers, 3);
        assert_eq!(stats.running_containers, 0);
        assert_eq!(stats.stopped_containers, 0);
    }
}
