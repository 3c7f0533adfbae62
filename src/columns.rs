//! Column names shared by the exports and the merged report.

use crate::data::schema::ColumnInsert;

// Trend export (primary)
pub const RAM_UTIL: &str = "%_RAM_Util";
pub const RAM_UTIL_MAX: &str = "%_RAM_Util_MAX";

// Disk utilization export
pub const DISK: &str = "Disk";

// Filesystem export
pub const FS_TOTAL_GB: &str = "Total_GB";
pub const FS_FREE_GB: &str = "Free_GB";

// Spike summary export / merged report
pub const CPU_SPIKES_COUNT: &str = "CPU_Spikes_Count";
pub const CPU_SPIKE_MAX_S: &str = "CPU_Spike_Max_s";
pub const CPU_SPIKES_TOTAL_S: &str = "CPU_Spikes_Total_s";

// Derived columns
pub const DISK_COUNT_BACKEND: &str = "Disk_Count_Backend";
pub const DISK_COUNT_LOGICAL: &str = "Disk_Count_Logical";
pub const FS_COUNT: &str = "FS_Count";
pub const DISK_TOTAL_AGG_GB: &str = "Disk_Total_Agg_GB";
pub const DISK_USED_AGG_GB: &str = "Disk_Used_Agg_GB";
pub const DISK_USED_AGG_PCT: &str = "%_Disk_Used_Agg";

/// Where the derived columns go in the merged report, in application order.
pub fn derived_inserts() -> Vec<ColumnInsert> {
    vec![
        ColumnInsert::after(DISK_COUNT_BACKEND, RAM_UTIL_MAX),
        ColumnInsert::after(DISK_COUNT_LOGICAL, DISK_COUNT_BACKEND),
        ColumnInsert::after(FS_COUNT, DISK_COUNT_LOGICAL),
        ColumnInsert::after(DISK_TOTAL_AGG_GB, FS_COUNT),
        ColumnInsert::after(DISK_USED_AGG_GB, DISK_TOTAL_AGG_GB),
        ColumnInsert::after(DISK_USED_AGG_PCT, DISK_USED_AGG_GB),
        ColumnInsert::after(CPU_SPIKES_COUNT, DISK_USED_AGG_PCT),
        ColumnInsert::after(CPU_SPIKE_MAX_S, CPU_SPIKES_COUNT),
        ColumnInsert::after(CPU_SPIKES_TOTAL_S, CPU_SPIKE_MAX_S),
    ]
}
