use crate::db::models::{Device, NewDevice};
use crate::schema;
use diesel::prelude::*;
use diesel::PgConnection;
use log::{debug, info};

pub fn register_device(conn: &mut PgConnection, new_device: &NewDevice) -> Result<Device, String> {
    use schema::devices::dsl as D;

    let device: Device = diesel::insert_into(D::devices)
        .values(new_device)
        .returning(Device::as_returning())
        .get_result(conn)
        .map_err(|e| format!("insert device failed: {}", e))?;
    info!(
        "Devices: registered {} (\"{}\") for owner {}",
        device.device_id, device.given_name, device.owner_id
    );
    Ok(device)
}

/// Register several devices in a single insert.
pub fn register_devices(conn: &mut PgConnection, new_devices: &[NewDevice]) -> Result<Vec<Device>, String> {
    if new_devices.is_empty() {
        return Ok(Vec::new());
    }

    use schema::devices::dsl as D;

    let rows: Vec<Device> = diesel::insert_into(D::devices)
        .values(new_devices)
        .returning(Device::as_returning())
        .get_results(conn)
        .map_err(|e| format!("insert devices failed: {}", e))?;
    debug!("Devices: registered {} device(s)", rows.len());
    Ok(rows)
}

pub fn devices_for_owner(conn: &mut PgConnection, owner_id: i64) -> Result<Vec<Device>, String> {
    use schema::devices::dsl as D;

    D::devices
        .filter(D::owner_id.eq(owner_id))
        .order(D::id.asc())
        .select(Device::as_select())
        .load(conn)
        .map_err(|e| format!("fetch devices for owner {} failed: {}", owner_id, e))
}

/// All devices reporting under a hardware identifier. Identifiers are not unique.
pub fn devices_by_device_id(conn: &mut PgConnection, device_id: &str) -> Result<Vec<Device>, String> {
    use schema::devices::dsl as D;

    D::devices
        .filter(D::device_id.eq(device_id))
        .order(D::id.asc())
        .select(Device::as_select())
        .load(conn)
        .map_err(|e| format!("fetch devices by device_id failed: {}", e))
}

pub fn rename_device(conn: &mut PgConnection, id: i64, given_name: &str) -> Result<Device, String> {
    use schema::devices::dsl as D;

    diesel::update(D::devices.find(id))
        .set(D::given_name.eq(given_name))
        .returning(Device::as_returning())
        .get_result(conn)
        .map_err(|e| format!("rename device {} failed: {}", id, e))
}

pub fn delete_device(conn: &mut PgConnection, id: i64) -> Result<usize, String> {
    use schema::devices::dsl as D;

    diesel::delete(D::devices.find(id))
        .execute(conn)
        .map_err(|e| format!("delete device {} failed: {}", id, e))
}
