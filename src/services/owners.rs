use crate::db::models::{NewUser, User};
use crate::schema;
use diesel::prelude::*;
use diesel::PgConnection;
use log::{debug, info};

pub fn create_user(conn: &mut PgConnection, new_user: &NewUser) -> Result<User, String> {
    use schema::users::dsl as U;

    let user: User = diesel::insert_into(U::users)
        .values(new_user)
        .returning(User::as_returning())
        .get_result(conn)
        .map_err(|e| format!("insert user failed: {}", e))?;
    debug!("Owners: created user {} ({})", user.id, user.username);
    Ok(user)
}

/// Find an existing user by username or create one.
///
/// A given email replaces the stored one; `None` leaves it untouched.
pub fn ensure_user(conn: &mut PgConnection, new_user: &NewUser) -> Result<User, String> {
    use schema::users::dsl as U;

    let insert = diesel::insert_into(U::users).values(new_user).on_conflict(U::username);
    match &new_user.email {
        Some(email) => insert.do_update().set(U::email.eq(email)).execute(conn),
        None => insert.do_nothing().execute(conn),
    }
    .map_err(|e| format!("upsert user failed: {}", e))?;

    U::users
        .filter(U::username.eq(&new_user.username))
        .select(User::as_select())
        .first(conn)
        .map_err(|e| format!("fetch user failed: {}", e))
}

pub fn find_user(conn: &mut PgConnection, user_id: i64) -> Result<Option<User>, String> {
    use schema::users::dsl as U;

    U::users
        .find(user_id)
        .select(User::as_select())
        .first(conn)
        .optional()
        .map_err(|e| format!("fetch user {} failed: {}", user_id, e))
}

/// Delete a user. Their devices, and those devices' message links, go with them.
///
/// Returns the number of user rows removed (0 if the user did not exist).
pub fn delete_user(conn: &mut PgConnection, user_id: i64) -> Result<usize, String> {
    use schema::users::dsl as U;

    let removed = diesel::delete(U::users.find(user_id))
        .execute(conn)
        .map_err(|e| format!("delete user {} failed: {}", user_id, e))?;
    if removed > 0 {
        info!("Owners: deleted user {} and their devices", user_id);
    }
    Ok(removed)
}
