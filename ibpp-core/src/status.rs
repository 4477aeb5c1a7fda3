//! Status vector filled by every engine call

use std::{
    cell::OnceCell,
    fmt::Write,
    ops::{Deref, DerefMut},
};

use crate::{client::FbClient, ibase, FbError};

pub struct Status {
    vector: Box<ibase::ISC_STATUS_ARRAY>,
    message: OnceCell<String>,
}

impl Default for Status {
    fn default() -> Self {
        Status {
            vector: Box::new([0; 20]),
            message: OnceCell::new(),
        }
    }
}

impl Deref for Status {
    type Target = ibase::ISC_STATUS_ARRAY;

    fn deref(&self) -> &Self::Target {
        &self.vector
    }
}

impl DerefMut for Status {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // Any write invalidates the composed message
        self.message = OnceCell::new();
        &mut self.vector
    }
}

impl Status {
    /// Slot 0 holds the error marker and slot 1 a non zero code on failure
    pub fn has_errors(&self) -> bool {
        self.vector[0] == ibase::isc_arg_gds && self.vector[1] != 0
    }

    /// Engine code of the first error
    pub fn engine_code(&self) -> ibase::ISC_STATUS {
        if self.vector[0] == ibase::isc_arg_gds {
            self.vector[1]
        } else {
            0
        }
    }

    pub fn sql_code(&self, client: &dyn FbClient) -> i32 {
        client.sqlcode(self)
    }

    pub fn reset(&mut self) {
        self.vector.iter_mut().for_each(|s| *s = 0);
        self.message = OnceCell::new();
    }

    /// Fills the vector with a single engine error, as fbclient does
    pub fn set_error(&mut self, engine_code: ibase::ISC_STATUS) {
        self.reset();
        self.vector[0] = ibase::isc_arg_gds;
        self.vector[1] = engine_code;
        self.vector[2] = ibase::isc_arg_end;
    }

    /// Message composed from the sql and engine interpretations of the
    /// vector. Built on first use, then cached until the next reset
    pub fn message(&self, client: &dyn FbClient) -> &str {
        self.message.get_or_init(|| self.compose(client))
    }

    fn compose(&self, client: &dyn FbClient) -> String {
        let mut msg = String::new();
        let mut buffer = vec![0u8; 1024];

        let sqlcode = client.sqlcode(self);
        if sqlcode != -999 {
            let len = client.sql_interprete(sqlcode as i16, &mut buffer);
            let _ = write!(
                msg,
                "SQL Message : {}\n{}\n\n",
                sqlcode,
                String::from_utf8_lossy(&buffer[..len.min(buffer.len())])
            );
        }

        let _ = write!(msg, "Engine Code    : {}\nEngine Message :", self.engine_code());

        let mut position = 0;
        loop {
            let len = client.interpret(&mut buffer, self, &mut position);
            if len == 0 {
                break;
            }

            let _ = write!(
                msg,
                "\n{}",
                String::from_utf8_lossy(&buffer[..len.min(buffer.len())])
            );
        }

        msg
    }

    pub fn as_error(&self, client: &dyn FbClient, origin: &'static str, context: &str) -> FbError {
        FbError::Sql {
            origin,
            msg: format!("{}\n\n{}", context, self.message(client)),
            sql_code: self.sql_code(client),
            engine_code: self.engine_code(),
        }
    }

    /// Turns a failed call into an error
    pub fn check(
        &self,
        client: &dyn FbClient,
        origin: &'static str,
        context: &str,
    ) -> Result<(), FbError> {
        if self.has_errors() {
            Err(self.as_error(client, origin, context))
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Status").field(&&self.vector[..]).finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn errors() {
        let mut status = Status::default();
        assert!(!status.has_errors());
        assert_eq!(0, status.engine_code());

        status.set_error(ibase::isc_io_error);
        assert!(status.has_errors());
        assert_eq!(ibase::isc_io_error, status.engine_code());

        status.reset();
        assert!(!status.has_errors());
        assert!(status.iter().all(|s| *s == 0));
    }

    #[test]
    fn success_vector() {
        // fbclient leaves [1, 0, 0] on success
        let mut status = Status::default();
        status[0] = ibase::isc_arg_gds;
        assert!(!status.has_errors());
    }
}
