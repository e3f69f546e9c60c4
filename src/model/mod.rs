/// Stores a strum enum as its snake_case name in a `VARCHAR` column.
macro_rules! text_column {
    ($($ty:ty),+ $(,)?) => {$(
        impl sqlx::Type<sqlx::MySql> for $ty {
            fn type_info() -> sqlx::mysql::MySqlTypeInfo {
                <str as sqlx::Type<sqlx::MySql>>::type_info()
            }

            fn compatible(ty: &sqlx::mysql::MySqlTypeInfo) -> bool {
                <str as sqlx::Type<sqlx::MySql>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::MySql> for $ty {
            fn decode(
                value: sqlx::mysql::MySqlValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let raw = <&str as sqlx::Decode<'r, sqlx::MySql>>::decode(value)?;
                raw.parse::<$ty>().map_err(|e| {
                    format!("invalid {} value {raw:?}: {e}", stringify!($ty)).into()
                })
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::MySql> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::MySql as sqlx::database::HasArguments<'q>>::ArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <String as sqlx::Encode<'q, sqlx::MySql>>::encode(self.to_string(), buf)
            }
        }
    )+};
}

pub mod employee;
pub mod leave_attachment;
pub mod leave_ledger;
pub mod leave_request;
pub mod quota_rule;
pub mod role;

text_column!(
    employee::EmploymentType,
    employee::EmployeeStatus,
    leave_request::LeaveCategory,
    leave_request::HalfDay,
    leave_request::LeaveStatus,
    role::Role,
);
