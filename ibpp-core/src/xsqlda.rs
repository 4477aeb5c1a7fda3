//! Owned XSQLDA descriptor area

use std::{alloc, mem, os::raw::c_char, ptr};

use crate::{ibase, FbError};

/// Longest name the engine stores in a XSQLVAR
pub const MAX_NAME_LENGTH: usize = 31;

/// Heap allocated XSQLDA with room for `sqln` variables, laid out
/// exactly as the fbclient expects
pub struct XSqlDa {
    ptr: ptr::NonNull<ibase::XSQLDA>,
    len: i16,
}

impl XSqlDa {
    /// Allocates a zeroed descriptor area for `len` variables
    pub fn new(len: i16) -> Result<Self, FbError> {
        if len < 0 {
            return Err(FbError::logic(
                "XSqlDa::new",
                "Negative descriptor length",
            ));
        }

        let layout = layout(len)?;
        let raw = unsafe { alloc::alloc_zeroed(layout) } as *mut ibase::XSQLDA;
        let ptr = match ptr::NonNull::new(raw) {
            Some(ptr) => ptr,
            None => alloc::handle_alloc_error(layout),
        };

        let mut xsqlda = XSqlDa { ptr, len };
        let header = xsqlda.header_mut();
        header.version = ibase::SQLDA_VERSION1;
        header.sqln = len;

        Ok(xsqlda)
    }

    fn header(&self) -> &ibase::XSQLDA {
        unsafe { self.ptr.as_ref() }
    }

    fn header_mut(&mut self) -> &mut ibase::XSQLDA {
        unsafe { self.ptr.as_mut() }
    }

    /// Allocated variables
    pub fn sqln(&self) -> i16 {
        self.header().sqln
    }

    /// Variables described by the engine
    pub fn sqld(&self) -> i16 {
        self.header().sqld
    }

    pub fn set_sqld(&mut self, sqld: i16) {
        self.header_mut().sqld = sqld;
    }

    /// All the allocated variables
    pub fn vars(&self) -> &[ibase::XSQLVAR] {
        unsafe {
            std::slice::from_raw_parts(
                self.header().sqlvar.as_ptr(),
                self.len as usize,
            )
        }
    }

    pub fn vars_mut(&mut self) -> &mut [ibase::XSQLVAR] {
        let len = self.len as usize;
        unsafe { std::slice::from_raw_parts_mut(self.header_mut().sqlvar.as_mut_ptr(), len) }
    }

    pub fn get_xsqlvar(&self, col: usize) -> Option<&ibase::XSQLVAR> {
        self.vars().get(col)
    }

    pub fn get_xsqlvar_mut(&mut self, col: usize) -> Option<&mut ibase::XSQLVAR> {
        self.vars_mut().get_mut(col)
    }

    pub fn as_ptr(&self) -> *const ibase::XSQLDA {
        self.ptr.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut ibase::XSQLDA {
        self.ptr.as_ptr()
    }

    /// Copy of the header and every variable. Data and null indicator
    /// pointers are copied as they are: the owner must repoint them
    pub fn try_clone(&self) -> Result<Self, FbError> {
        let mut other = XSqlDa::new(self.len)?;
        other.set_sqld(self.sqld());
        other.vars_mut().copy_from_slice(self.vars());

        Ok(other)
    }
}

impl Drop for XSqlDa {
    fn drop(&mut self) {
        if let Ok(layout) = layout(self.len) {
            unsafe { alloc::dealloc(self.ptr.as_ptr() as *mut u8, layout) }
        }
    }
}

impl std::fmt::Debug for XSqlDa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XSqlDa")
            .field("sqln", &self.sqln())
            .field("sqld", &self.sqld())
            .finish()
    }
}

fn layout(len: i16) -> Result<alloc::Layout, FbError> {
    // The struct already holds one XSQLVAR
    let extra = (len.max(1) - 1) as usize;

    alloc::Layout::from_size_align(
        mem::size_of::<ibase::XSQLDA>() + extra * mem::size_of::<ibase::XSQLVAR>(),
        mem::align_of::<ibase::XSQLDA>(),
    )
    .map_err(|e| FbError::logic("XSqlDa::new", e.to_string()))
}

impl ibase::XSQLVAR {
    /// Sql type without the nullable bit
    pub fn sql_type(&self) -> u32 {
        (self.sqltype & !1) as u32
    }

    pub fn is_nullable(&self) -> bool {
        self.sqltype & 1 == 1
    }

    pub fn name(&self) -> String {
        read_name(&self.sqlname, self.sqlname_length)
    }

    pub fn alias(&self) -> String {
        read_name(&self.aliasname, self.aliasname_length)
    }

    pub fn relation(&self) -> String {
        read_name(&self.relname, self.relname_length)
    }

    pub fn owner(&self) -> String {
        read_name(&self.ownname, self.ownname_length)
    }

    pub fn set_name(&mut self, name: &str) {
        self.sqlname_length = write_name(&mut self.sqlname, name);
    }

    pub fn set_alias(&mut self, alias: &str) {
        self.aliasname_length = write_name(&mut self.aliasname, alias);
    }

    pub fn set_relation(&mut self, relation: &str) {
        self.relname_length = write_name(&mut self.relname, relation);
    }
}

/// Reads at most 31 bytes of a descriptor name, leaving the stored length untouched
fn read_name(buf: &[c_char; 32], len: i16) -> String {
    let len = (len.max(0) as usize).min(MAX_NAME_LENGTH);
    let bytes: Vec<u8> = buf[..len].iter().map(|c| *c as u8).collect();

    String::from_utf8_lossy(&bytes).into_owned()
}

fn write_name(buf: &mut [c_char; 32], name: &str) -> i16 {
    let bytes = name.as_bytes();
    let len = bytes.len().min(MAX_NAME_LENGTH);

    *buf = [0; 32];
    for (dst, src) in buf.iter_mut().zip(&bytes[..len]) {
        *dst = *src as c_char;
    }

    len as i16
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn alloc_and_clone() -> Result<(), FbError> {
        let mut xsqlda = XSqlDa::new(3)?;
        assert_eq!(3, xsqlda.sqln());
        assert_eq!(0, xsqlda.sqld());
        assert_eq!(ibase::SQLDA_VERSION1, unsafe { (*xsqlda.as_ptr()).version });

        xsqlda.set_sqld(2);
        let var = xsqlda.get_xsqlvar_mut(1).unwrap();
        var.sqltype = ibase::SQL_LONG as i16 + 1;
        var.set_name("ID");

        let copy = xsqlda.try_clone()?;
        assert_eq!(2, copy.sqld());
        let var = copy.get_xsqlvar(1).unwrap();
        assert_eq!(ibase::SQL_LONG, var.sql_type());
        assert!(var.is_nullable());
        assert_eq!("ID", var.name());

        assert!(xsqlda.get_xsqlvar(3).is_none());

        Ok(())
    }

    #[test]
    fn empty_area() -> Result<(), FbError> {
        let xsqlda = XSqlDa::new(0)?;
        assert_eq!(0, xsqlda.vars().len());

        Ok(())
    }

    #[test]
    fn names_are_truncated_on_read() -> Result<(), FbError> {
        let mut xsqlda = XSqlDa::new(1)?;
        let var = xsqlda.get_xsqlvar_mut(0).unwrap();

        var.set_alias(&"A".repeat(40));
        assert_eq!(31, var.alias().len());

        // A bogus length coming from the engine
        var.aliasname_length = 32;
        assert_eq!(31, var.alias().len());
        assert_eq!(32, var.aliasname_length);

        Ok(())
    }
}
