use crate::data_structure::listpack::listpack::ListPack;
use crate::data_structure::listpack::LpValue;

pub struct ListPackIter<'a> {
    next_pos: Option<usize>,
    listpack: &'a ListPack,
}

impl ListPack {
    pub fn iter(&self) -> ListPackIter<'_> {
        ListPackIter {
            next_pos: self.first(),
            listpack: self,
        }
    }
}

impl<'a> Iterator for ListPackIter<'a> {
    type Item = LpValue<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.next_pos?;
        self.next_pos = self.listpack.next(pos);
        self.listpack.get(pos)
    }
}

impl<'a> IntoIterator for &'a ListPack {
    type Item = LpValue<'a>;
    type IntoIter = ListPackIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
