use crate::db::models::{Device, DeviceMessage, DeviceMessageDevice, NewDeviceMessage};
use crate::schema;
use crate::services::devices;
use diesel::prelude::*;
use diesel::PgConnection;
use log::debug;

// Two bind parameters per link row; stays well under Postgres' 65535 limit.
const LINK_BATCH_ROWS: usize = 10_000;

/// Store a telemetry message and link it to `device_ids` (possibly none) atomically.
pub fn record_message(
    conn: &mut PgConnection,
    message: &NewDeviceMessage,
    device_ids: &[i64],
) -> Result<DeviceMessage, String> {
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        let row: DeviceMessage = diesel::insert_into(schema::device_messages::table)
            .values(message)
            .returning(DeviceMessage::as_returning())
            .get_result(conn)?;
        insert_links(conn, row.id, device_ids)?;
        Ok(row)
    })
    .map_err(|e| format!("insert device message failed: {}", e))
}

/// Store a batch of messages, each linked to the same set of devices.
pub fn record_messages(
    conn: &mut PgConnection,
    messages: &[NewDeviceMessage],
    device_ids: &[i64],
) -> Result<usize, String> {
    if messages.is_empty() {
        return Ok(0);
    }

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        let ids: Vec<i64> = diesel::insert_into(schema::device_messages::table)
            .values(messages)
            .returning(schema::device_messages::id)
            .get_results(conn)?;
        let links: Vec<DeviceMessageDevice> = ids
            .iter()
            .flat_map(|message_id| link_rows(*message_id, device_ids))
            .collect();
        insert_link_rows(conn, &links)?;
        Ok(ids.len())
    })
    .map_err(|e| format!("insert device messages failed: {}", e))
}

/// Link an existing message to more devices. Links that already exist are skipped.
///
/// Returns the number of new links.
pub fn link_devices(conn: &mut PgConnection, message_id: i64, device_ids: &[i64]) -> Result<usize, String> {
    insert_links(conn, message_id, device_ids)
        .map_err(|e| format!("link message {} to devices failed: {}", message_id, e))
}

pub fn unlink_device(conn: &mut PgConnection, message_id: i64, device_id: i64) -> Result<usize, String> {
    use schema::device_message_devices::dsl as L;

    diesel::delete(L::device_message_devices.find((message_id, device_id)))
        .execute(conn)
        .map_err(|e| format!("unlink message {} from device {} failed: {}", message_id, device_id, e))
}

fn link_rows(message_id: i64, device_ids: &[i64]) -> impl Iterator<Item = DeviceMessageDevice> + '_ {
    device_ids.iter().map(move |device_id| DeviceMessageDevice {
        device_message_id: message_id,
        device_id: *device_id,
    })
}

fn insert_links(conn: &mut PgConnection, message_id: i64, device_ids: &[i64]) -> QueryResult<usize> {
    let links: Vec<DeviceMessageDevice> = link_rows(message_id, device_ids).collect();
    let inserted = insert_link_rows(conn, &links)?;
    debug!("Ingest: message {} linked to {} new device(s)", message_id, inserted);
    Ok(inserted)
}

fn insert_link_rows(conn: &mut PgConnection, links: &[DeviceMessageDevice]) -> QueryResult<usize> {
    use schema::device_message_devices::dsl as L;

    let mut inserted = 0;
    for chunk in links.chunks(LINK_BATCH_ROWS) {
        inserted += diesel::insert_into(L::device_message_devices)
            .values(chunk)
            .on_conflict((L::device_message_id, L::device_id))
            .do_nothing()
            .execute(conn)?;
    }
    Ok(inserted)
}

pub fn devices_for_message(conn: &mut PgConnection, message_id: i64) -> Result<Vec<Device>, String> {
    use schema::device_message_devices::dsl as L;
    use schema::devices::dsl as D;

    L::device_message_devices
        .inner_join(D::devices)
        .filter(L::device_message_id.eq(message_id))
        .order(D::id.asc())
        .select(Device::as_select())
        .load(conn)
        .map_err(|e| format!("fetch devices for message {} failed: {}", message_id, e))
}

/// Messages linked to a device, newest first.
pub fn messages_for_device(conn: &mut PgConnection, device_id: i64) -> Result<Vec<DeviceMessage>, String> {
    use schema::device_message_devices::dsl as L;
    use schema::device_messages::dsl as M;

    L::device_message_devices
        .inner_join(M::device_messages)
        .filter(L::device_id.eq(device_id))
        .order((M::created_at.desc(), M::id.desc()))
        .select(DeviceMessage::as_select())
        .load(conn)
        .map_err(|e| format!("fetch messages for device {} failed: {}", device_id, e))
}

/// Most recent message linked to a device, if it ever reported.
pub fn latest_message_for_device(conn: &mut PgConnection, device_id: i64) -> Result<Option<DeviceMessage>, String> {
    use schema::device_message_devices::dsl as L;
    use schema::device_messages::dsl as M;

    L::device_message_devices
        .inner_join(M::device_messages)
        .filter(L::device_id.eq(device_id))
        .order((M::created_at.desc(), M::id.desc()))
        .select(DeviceMessage::as_select())
        .first(conn)
        .optional()
        .map_err(|e| format!("fetch latest message for device {} failed: {}", device_id, e))
}

/// Latest message per device for all devices of an owner, skipping devices that never reported.
pub fn latest_messages_for_owner(
    conn: &mut PgConnection,
    owner_id: i64,
) -> Result<Vec<(Device, DeviceMessage)>, String> {
    let mut latest = Vec::new();
    for device in devices::devices_for_owner(conn, owner_id)? {
        if let Some(message) = latest_message_for_device(conn, device.id)? {
            latest.push((device, message));
        }
    }
    Ok(latest)
}
