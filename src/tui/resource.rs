/// State of a background operation, in place of a `loading: bool` plus `Option<T>` pair.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Resource<T, E = String> {
    /// Never requested
    #[default]
    NotAsked,
    Loading,
    Success(T),
    Failure(E),
}

impl<T, E> Resource<T, E> {
    pub fn from_result(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Resource::Success(data),
            Err(e) => Resource::Failure(e),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Resource::Loading)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Resource::Failure(_))
    }

    pub fn as_ref(&self) -> Resource<&T, &E> {
        match self {
            Resource::NotAsked => Resource::NotAsked,
            Resource::Loading => Resource::Loading,
            Resource::Success(data) => Resource::Success(data),
            Resource::Failure(e) => Resource::Failure(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_result() {
        let ok: Resource<u32> = Resource::from_result(Ok(3));
        assert_eq!(ok, Resource::Success(3));
        let err: Resource<u32> = Resource::from_result(Err("boom".to_string()));
        assert!(err.is_failure());
        assert!(!Resource::<u32>::default().is_loading());
    }
}
