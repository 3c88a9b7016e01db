pub trait ShortTypeName
{
    fn short_type_name() -> &'static str;
}
impl<T: ?Sized> ShortTypeName for T
{
    #[inline]
    fn short_type_name() -> &'static str
    {
        let type_name = std::any::type_name::<T>();
        match type_name.rfind(':')
        {
            None => type_name,
            Some(i) => &type_name[(i + 1)..]
        }
    }
}
