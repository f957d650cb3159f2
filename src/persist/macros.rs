//! Typed accessor generation for persistent models.

/// Generates a trait of typed `get_<property>` / `set_<property>` methods
/// and implements it for `Persistent<Model>`.
///
/// ```ignore
/// persistent_accessors!(pub trait PlanFields for Plan {
///     name: String,
///     userid: i64,
/// });
/// ```
#[macro_export]
macro_rules! persistent_accessors {
    ($vis:vis trait $trait_name:ident for $model:ty { $($property:ident : $ty:ty),+ $(,)? }) => {
        $crate::paste::paste! {
            $vis trait $trait_name {
                $(
                    fn [<get_ $property>](&mut self) -> $crate::core::Result<$ty>;
                    fn [<set_ $property>](&mut self, value: $ty) -> $crate::core::Result<()>;
                )+
            }

            impl $trait_name for $crate::persist::Persistent<$model> {
                $(
                    fn [<get_ $property>](&mut self) -> $crate::core::Result<$ty> {
                        self.get_as::<$ty>(stringify!($property))
                    }

                    fn [<set_ $property>](&mut self, value: $ty) -> $crate::core::Result<()> {
                        self.set(stringify!($property), value)
                    }
                )+
            }
        }
    };
}
